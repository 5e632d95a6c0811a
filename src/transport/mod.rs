//! The boundary between a connection's state machine and network I/O.
//!
//! A [`Transport`] receives a fully encoded [`WireRequest`] plus an
//! [`EventSink`] and reports lifecycle events through the sink from
//! whatever thread it likes. [`HyperTransport`] is the default adapter.

mod connectjob;
mod httptransport;
mod socket;
mod tls;
mod uploadbody;

pub use connectjob::ConnectJob;
pub use httptransport::{HyperTransport, DEFAULT_UPLOAD_CHUNK_SIZE};
pub use socket::SocketType;
pub use tls::TlsConfig;
pub use uploadbody::UploadBody;

use crate::connection::EventSink;
use crate::http::request::WireRequest;
use tokio::task::JoinHandle;

/// Performs network I/O for connections.
pub trait Transport: Send + Sync {
    /// Begin `request`. Every started request must eventually end with
    /// `EventSink::finish` or `EventSink::fail`; dropping the sink counts
    /// as a failure.
    fn begin(&self, request: WireRequest, sink: EventSink) -> Box<dyn TransportTask>;
}

/// Handle to one in-flight transport request.
pub trait TransportTask: Send {
    /// Abort I/O. Events raised after this are ignored by the connection.
    fn cancel(self: Box<Self>);
}

/// A transport task backed by a tokio task.
#[derive(Debug)]
pub struct AbortOnCancel(JoinHandle<()>);

impl AbortOnCancel {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self(handle)
    }
}

impl TransportTask for AbortOnCancel {
    fn cancel(self: Box<Self>) {
        self.0.abort();
    }
}
