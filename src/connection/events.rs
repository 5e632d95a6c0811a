//! The channel through which a transport drives a connection.

use super::Connection;
use crate::base::neterror::NetError;
use crate::http::response::ResponseHead;
use bytes::Bytes;
use std::fmt;

/// Reports transport events to one connection.
///
/// Methods may be called from any thread. `finish` and `fail` consume the
/// sink; dropping a sink without calling either reports
/// [`NetError::ConnectionAborted`], so a started connection always reaches a
/// terminal event. Events arriving after cancellation, or after a terminal
/// event, are ignored.
pub struct EventSink {
    conn: Option<Connection>,
}

impl EventSink {
    pub(crate) fn new(conn: Connection) -> Self {
        Self { conn: Some(conn) }
    }

    fn conn(&self) -> Option<&Connection> {
        self.conn.as_ref()
    }

    /// An authentication or server-trust challenge was raised. The
    /// connection proceeds without credentials.
    pub fn challenge(&self) {
        if let Some(conn) = self.conn() {
            conn.on_challenge();
        }
    }

    /// Response headers arrived.
    pub fn response(&self, head: ResponseHead) {
        if let Some(conn) = self.conn() {
            conn.on_response(head);
        }
    }

    /// A chunk of the response body arrived.
    pub fn data(&self, chunk: Bytes) {
        if let Some(conn) = self.conn() {
            conn.on_data(chunk);
        }
    }

    /// Total request bytes sent so far.
    pub fn upload_progress(&self, sent: u64, expected: Option<u64>) {
        if let Some(conn) = self.conn() {
            conn.on_upload_progress(sent, expected);
        }
    }

    /// A detached handle for reporting upload progress from a request body.
    pub fn upload_reporter(&self) -> UploadReporter {
        UploadReporter {
            conn: self.conn.clone(),
        }
    }

    pub fn finish(mut self) {
        if let Some(conn) = self.conn.take() {
            conn.on_finish();
        }
    }

    pub fn fail(mut self, error: NetError) {
        if let Some(conn) = self.conn.take() {
            conn.on_fail(error);
        }
    }
}

impl Drop for EventSink {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.on_fail(NetError::ConnectionAborted);
        }
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("connection", &self.conn.as_ref().map(Connection::id))
            .finish()
    }
}

/// Upload progress half of an [`EventSink`].
#[derive(Clone)]
pub struct UploadReporter {
    conn: Option<Connection>,
}

impl UploadReporter {
    pub fn report(&self, sent: u64, expected: Option<u64>) {
        if let Some(conn) = &self.conn {
            conn.on_upload_progress(sent, expected);
        }
    }
}

impl fmt::Debug for UploadReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadReporter")
            .field("connection", &self.conn.as_ref().map(Connection::id))
            .finish()
    }
}
