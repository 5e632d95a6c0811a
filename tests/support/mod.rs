//! Shared fixtures: a scripted transport and a callback recorder.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use urlconn::connection::{ConnectionBuilder, ContextConfig};
use urlconn::dispatch::{Executor, InlineExecutor};
use urlconn::http::WireRequest;
use urlconn::{
    Connection, ConnectionContext, EventSink, MainQueue, ManualBackgroundGuard, Transport,
    TransportTask,
};

/// Holds every begun request so the test can drive its events.
#[derive(Default)]
pub struct ScriptedTransport {
    pending: Mutex<VecDeque<(WireRequest, EventSink)>>,
    begun: AtomicUsize,
    cancelled: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    /// The oldest request not yet taken.
    pub fn take(&self) -> (WireRequest, EventSink) {
        self.pending.lock().pop_front().expect("no pending request")
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn begun(&self) -> usize {
        self.begun.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }
}

struct CountingTask(Arc<AtomicUsize>);

impl TransportTask for CountingTask {
    fn cancel(self: Box<Self>) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl Transport for ScriptedTransport {
    fn begin(&self, request: WireRequest, sink: EventSink) -> Box<dyn TransportTask> {
        self.begun.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().push_back((request, sink));
        Box::new(CountingTask(self.cancelled.clone()))
    }
}

/// Something a callback observed.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Progress { uploaded: u64, downloaded: u64 },
    Parse,
    Complete { succeeded: bool },
}

#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn completions(&self) -> usize {
        self.count(|e| matches!(e, Event::Complete { .. }))
    }

    pub fn parses(&self) -> usize {
        self.count(|e| matches!(e, Event::Parse))
    }

    pub fn count(&self, f: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|e| f(e)).count()
    }

    pub fn push(&self, event: Event) {
        self.events.lock().push(event);
    }

    /// Attach progress and completion recording to `builder`.
    pub fn watch(&self, builder: ConnectionBuilder) -> ConnectionBuilder {
        let progress = self.clone();
        let complete = self.clone();
        builder
            .on_progress(move |conn: &Connection| {
                progress.push(Event::Progress {
                    uploaded: conn.bytes_uploaded(),
                    downloaded: conn.bytes_downloaded(),
                })
            })
            .on_complete(move |conn: &Connection| {
                complete.push(Event::Complete {
                    succeeded: conn.succeeded(),
                })
            })
    }
}

pub struct Harness {
    pub context: ConnectionContext,
    pub primary: Arc<MainQueue>,
    pub transport: Arc<ScriptedTransport>,
    pub guard: Arc<ManualBackgroundGuard>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_worker(Arc::new(InlineExecutor))
    }

    pub fn with_worker(worker: Arc<dyn Executor>) -> Self {
        let primary = Arc::new(MainQueue::new());
        let transport = Arc::new(ScriptedTransport::default());
        let guard = Arc::new(ManualBackgroundGuard::new());
        let context = ConnectionContext::builder()
            .primary(primary.clone())
            .worker(worker)
            .transport(transport.clone())
            .background(guard.clone())
            .config(ContextConfig {
                user_agent: "urlconn-test/1.0".into(),
                ..Default::default()
            })
            .build()
            .expect("context");
        Self {
            context,
            primary,
            transport,
            guard,
        }
    }

    /// Run everything queued on the primary executor.
    pub fn pump(&self) -> usize {
        self.primary.run_pending()
    }
}

/// A 200 response head with an optional `Content-Length`.
pub fn ok_head(content_length: Option<u64>) -> urlconn::http::ResponseHead {
    let mut headers = http::HeaderMap::new();
    if let Some(len) = content_length {
        headers.insert(http::header::CONTENT_LENGTH, len.into());
    }
    urlconn::http::ResponseHead::new(http::StatusCode::OK, http::Version::HTTP_11, headers)
}
