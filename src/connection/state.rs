//! Mutable per-connection state, guarded by the connection's lock.

use super::callbacks::{Callbacks, ParseResult};
use crate::background::BackgroundTaskId;
use crate::base::error::ConnectionError;
use crate::base::loadstate::LoadState;
use crate::http::response::ResponseHead;
use crate::transport::TransportTask;
use bytes::{Bytes, BytesMut};
use std::io::{self, Write};
use std::time::{Duration, Instant};

/// Where response bytes go. A sink and a buffer are never both populated.
pub(crate) enum ResponseBody {
    Buffer(BytesMut),
    Complete(Bytes),
    Sink(Box<dyn Write + Send>),
}

impl ResponseBody {
    pub fn write(&mut self, data: &[u8]) -> io::Result<()> {
        match self {
            ResponseBody::Buffer(buf) => {
                buf.extend_from_slice(data);
                Ok(())
            }
            ResponseBody::Complete(_) => Ok(()),
            ResponseBody::Sink(sink) => sink.write_all(data),
        }
    }

    /// Freeze the buffer or flush the sink.
    pub fn finish(&mut self) -> io::Result<()> {
        match self {
            ResponseBody::Buffer(buf) => {
                let data = std::mem::take(buf).freeze();
                *self = ResponseBody::Complete(data);
                Ok(())
            }
            ResponseBody::Complete(_) => Ok(()),
            ResponseBody::Sink(sink) => sink.flush(),
        }
    }

    pub fn data(&self) -> Option<Bytes> {
        match self {
            ResponseBody::Buffer(buf) => Some(Bytes::copy_from_slice(buf)),
            ResponseBody::Complete(data) => Some(data.clone()),
            ResponseBody::Sink(_) => None,
        }
    }

    pub fn is_sink(&self) -> bool {
        matches!(self, ResponseBody::Sink(_))
    }
}

/// Byte counters. An expected size of `None` means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub uploaded: u64,
    pub upload_expected: Option<u64>,
    pub downloaded: u64,
    pub download_expected: Option<u64>,
}

impl Progress {
    pub fn upload_fraction(&self) -> f32 {
        fraction(self.uploaded, self.upload_expected)
    }

    pub fn download_fraction(&self) -> f32 {
        fraction(self.downloaded, self.download_expected)
    }
}

fn fraction(done: u64, expected: Option<u64>) -> f32 {
    match expected {
        Some(total) if total > 0 => (done as f64 / total as f64).min(1.0) as f32,
        _ => 0.0,
    }
}

/// Timing marks. Every interval is measured from `started_at`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timing {
    pub started_at: Option<Instant>,
    pub challenge: Option<Duration>,
    pub first_response: Option<Duration>,
    pub finish_or_fail: Option<Duration>,
    pub parse_complete: Option<Duration>,
}

impl Timing {
    fn since_start(&self) -> Option<Duration> {
        self.started_at.map(|t| t.elapsed())
    }

    fn mark(slot: &mut Option<Duration>, started_at: Option<Instant>) {
        if slot.is_none() {
            *slot = started_at.map(|t| t.elapsed());
        }
    }

    pub fn mark_challenge(&mut self) {
        Self::mark(&mut self.challenge, self.started_at);
    }

    pub fn mark_first_response(&mut self) {
        Self::mark(&mut self.first_response, self.started_at);
    }

    pub fn mark_finish(&mut self) {
        Self::mark(&mut self.finish_or_fail, self.started_at);
    }

    pub fn mark_parse(&mut self) {
        self.parse_complete = self.since_start();
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Flags {
    pub started: bool,
    pub finished_loading: bool,
    pub completed: bool,
    pub succeeded: bool,
}

pub(crate) struct Shared {
    pub state: LoadState,
    pub flags: Flags,
    /// A finish or fail delivery has been queued; cancel no longer applies.
    pub finish_scheduled: bool,
    /// The completion job has been queued; later outcomes are discarded.
    pub completion_scheduled: bool,
    pub error: Option<ConnectionError>,
    pub parse_result: Option<ParseResult>,
    pub response: Option<ResponseHead>,
    pub body: ResponseBody,
    pub progress: Progress,
    pub timing: Timing,
    pub concurrency_at_start: usize,
    pub callbacks: Callbacks,
    pub task: Option<Box<dyn TransportTask>>,
    pub background: Option<BackgroundTaskId>,
}

impl Shared {
    pub fn new(callbacks: Callbacks, sink: Option<Box<dyn Write + Send>>) -> Self {
        Self {
            state: LoadState::Idle,
            flags: Flags::default(),
            finish_scheduled: false,
            completion_scheduled: false,
            error: None,
            parse_result: None,
            response: None,
            body: match sink {
                Some(sink) => ResponseBody::Sink(sink),
                None => ResponseBody::Buffer(BytesMut::new()),
            },
            progress: Progress::default(),
            timing: Timing::default(),
            concurrency_at_start: 0,
            callbacks,
            task: None,
            background: None,
        }
    }

    /// Transport events are dropped once cancelled or once a terminal
    /// delivery is queued.
    pub fn accepts_events(&self) -> bool {
        !self.finish_scheduled && !self.state.is_terminal() && self.state != LoadState::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_unknown_or_zero() {
        assert_eq!(fraction(10, None), 0.0);
        assert_eq!(fraction(10, Some(0)), 0.0);
        assert_eq!(fraction(5, Some(10)), 0.5);
        assert_eq!(fraction(20, Some(10)), 1.0);
    }

    #[test]
    fn test_buffer_freezes_on_finish() {
        let mut body = ResponseBody::Buffer(BytesMut::new());
        body.write(b"abc").unwrap();
        body.write(b"def").unwrap();
        body.finish().unwrap();
        assert_eq!(body.data().unwrap(), "abcdef");
    }

    #[test]
    fn test_sink_retains_nothing() {
        let mut body = ResponseBody::Sink(Box::new(Vec::new()));
        body.write(b"abc").unwrap();
        assert!(body.is_sink());
        assert!(body.data().is_none());
    }

    #[test]
    fn test_marks_are_set_once() {
        let mut timing = Timing {
            started_at: Some(Instant::now()),
            ..Default::default()
        };
        timing.mark_challenge();
        let first = timing.challenge;
        std::thread::sleep(Duration::from_millis(2));
        timing.mark_challenge();
        assert_eq!(timing.challenge, first);
    }
}
