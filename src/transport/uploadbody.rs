use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

type ProgressFn = Box<dyn FnMut(u64, u64) + Send>;

/// A fixed request body yielded in chunks, reporting each chunk as sent.
pub struct UploadBody {
    remaining: Bytes,
    chunk_size: usize,
    total: u64,
    sent: u64,
    on_progress: Option<ProgressFn>,
}

impl UploadBody {
    pub fn new(data: Bytes, chunk_size: usize) -> Self {
        Self {
            total: data.len() as u64,
            remaining: data,
            chunk_size: chunk_size.max(1),
            sent: 0,
            on_progress: None,
        }
    }

    /// Called with `(sent, total)` after each chunk is handed to the connection.
    pub fn on_progress<F: FnMut(u64, u64) + Send + 'static>(mut self, f: F) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }
}

impl Body for UploadBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.remaining.is_empty() {
            return Poll::Ready(None);
        }

        let n = this.chunk_size.min(this.remaining.len());
        let chunk = this.remaining.split_to(n);
        this.sent += n as u64;
        if let Some(report) = this.on_progress.as_mut() {
            report(this.sent, this.total);
        }
        Poll::Ready(Some(Ok(Frame::data(chunk))))
    }

    fn is_end_stream(&self) -> bool {
        self.remaining.is_empty()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.remaining.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_chunks_and_progress() {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let r = reports.clone();
        let mut body = UploadBody::new(Bytes::from_static(b"0123456789"), 4)
            .on_progress(move |sent, total| r.lock().push((sent, total)));

        assert_eq!(body.size_hint().exact(), Some(10));
        let mut chunks = Vec::new();
        while let Some(frame) = body.frame().await {
            chunks.push(frame.unwrap().into_data().unwrap());
        }

        assert_eq!(chunks, ["0123", "4567", "89"]);
        assert_eq!(*reports.lock(), vec![(4, 10), (8, 10), (10, 10)]);
        assert!(body.is_end_stream());
    }

    #[test]
    fn test_empty_body_is_end_stream() {
        let body = UploadBody::new(Bytes::new(), 1024);
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));
    }
}
