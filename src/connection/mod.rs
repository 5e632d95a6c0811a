//! Per-request lifecycle.
//!
//! A [`Connection`] moves `Idle -> Started -> (AwaitingChallenge) ->
//! Receiving -> FinishedLoading | Failed -> (Parsing) -> Completed`, or to
//! `Cancelled` from any non-terminal state. Transport events arrive through
//! an [`EventSink`] on any thread; progress and completion callbacks are
//! delivered on the context's primary executor and the parse step on its
//! worker executor.
//!
//! Delivery rules:
//! - completion fires at most once and is always the last callback;
//! - once `cancel()` returns no new delivery is scheduled, but a finish or
//!   fail already queued still completes;
//! - a parse step runs at most once, only after a successful finish;
//! - callbacks are always invoked with the connection lock released.

mod callbacks;
mod context;
mod events;
mod registry;
mod state;

pub use callbacks::{CompletionCallback, ParseCallback, ParseResult, Parsed, ProgressCallback};
pub use context::{ConnectionBuilder, ConnectionContext, ContextBuilder, ContextConfig, ContextError};
pub use events::{EventSink, UploadReporter};
pub use registry::{ActivityEvent, ConnectionId, ConnectionRegistry};
pub use state::{Progress, Timing};

use crate::background::BackgroundTaskId;
use crate::base::error::{ConnectionError, ConnectionErrorCode, ErrorDomain, StartError};
use crate::base::loadstate::LoadState;
use crate::base::neterror::NetError;
use crate::http::method::RequestMethod;
use crate::http::request::{RequestConfig, WireRequest};
use crate::http::response::ResponseHead;
use bytes::Bytes;
use callbacks::Callbacks;
use parking_lot::{Mutex, MutexGuard};
use state::Shared;
use std::any::Any;
use std::fmt;
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

pub(crate) struct Inner {
    id: ConnectionId,
    context: ConnectionContext,
    config: RequestConfig,
    shared: Mutex<Shared>,
}

/// Handle to one request. Clones refer to the same request.
#[derive(Clone)]
pub struct Connection {
    pub(crate) inner: Arc<Inner>,
}

impl Connection {
    pub(crate) fn new(
        context: ConnectionContext,
        config: RequestConfig,
        callbacks: Callbacks,
        sink: Option<Box<dyn Write + Send>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: ConnectionId::next(),
                context,
                config,
                shared: Mutex::new(Shared::new(callbacks, sink)),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.inner.shared.lock()
    }

    fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    // ===== Caller operations =====

    /// Validate, encode and register the request, then hand it to the
    /// transport.
    ///
    /// Local validation failures return an error, fire no callback and leave
    /// the connection unregistered. Returns a handle to this connection.
    pub fn start(&self) -> Result<Connection, StartError> {
        if self.lock().state != LoadState::Idle {
            return Err(StartError::NotIdle);
        }

        let context = &self.inner.context;
        let wire = WireRequest::build(&self.inner.config, &context.config().header_defaults())?;
        let background = self
            .inner
            .config
            .run_in_background
            .unwrap_or_else(|| context.config().runs_in_background(self.method()));

        {
            let mut shared = self.lock();
            if !shared.state.advance(LoadState::Started) || shared.flags.started {
                return Err(StartError::NotIdle);
            }
            shared.flags.started = true;
            shared.timing.started_at = Some(Instant::now());
        }

        let concurrent = context.registry().add(self);
        {
            let mut shared = self.lock();
            shared.concurrency_at_start = concurrent;
            if shared.state == LoadState::Cancelled {
                // Cancelled between the state change and registration.
                drop(shared);
                context.registry().remove(self.id());
                return Ok(self.clone());
            }
        }

        if background {
            self.begin_background();
        }

        tracing::debug!(
            id = %self.id(),
            method = %wire.method,
            url = %wire.url,
            concurrent,
            "connection started"
        );

        let task = context.transport().begin(wire, EventSink::new(self.clone()));

        let mut shared = self.lock();
        let aborted = shared.state == LoadState::Cancelled
            || (shared.finish_scheduled && !shared.flags.finished_loading);
        if aborted {
            drop(shared);
            task.cancel();
        } else if !shared.state.is_terminal() {
            shared.task = Some(task);
        }
        Ok(self.clone())
    }

    /// Cancel the request unless a finish or fail delivery is already
    /// queued, in which case that delivery still completes.
    ///
    /// After a successful cancel no callback ever fires for this connection.
    pub fn cancel(&self) {
        let (callbacks, task, background) = {
            let mut shared = self.lock();
            if shared.state.is_terminal() || shared.finish_scheduled {
                return;
            }
            shared.state.advance(LoadState::Cancelled);
            (
                shared.callbacks.take(),
                shared.task.take(),
                shared.background.take(),
            )
        };

        drop(callbacks);
        if let Some(task) = task {
            task.cancel();
        }
        self.end_background(background);
        self.inner.context.registry().remove(self.id());
        tracing::debug!(id = %self.id(), "connection cancelled");
    }

    /// Drop all three callbacks without cancelling the request. The
    /// connection still runs to completion and deregisters.
    pub fn clear_blocks(&self) {
        let callbacks = self.lock().callbacks.take();
        drop(callbacks);
    }

    // ===== Transport events =====

    pub(crate) fn on_challenge(&self) {
        let mut shared = self.lock();
        if !shared.accepts_events() {
            return;
        }
        shared.timing.mark_challenge();
        shared.state.advance(LoadState::AwaitingChallenge);
        tracing::debug!(id = %self.id(), "challenge received, proceeding without credentials");
    }

    pub(crate) fn on_response(&self, head: ResponseHead) {
        {
            let mut shared = self.lock();
            if !shared.accepts_events() {
                return;
            }
            shared.timing.mark_first_response();
            shared.state.advance(LoadState::Receiving);
            shared.progress.download_expected = head.content_length();
            tracing::debug!(id = %self.id(), status = head.status().as_u16(), "response received");
            shared.response = Some(head);
        }
        self.schedule_progress();
    }

    pub(crate) fn on_data(&self, chunk: Bytes) {
        let failed_task = {
            let mut shared = self.lock();
            if !shared.accepts_events() {
                return;
            }
            shared.timing.mark_first_response();
            shared.state.advance(LoadState::Receiving);
            match shared.body.write(&chunk) {
                Ok(()) => {
                    shared.progress.downloaded += chunk.len() as u64;
                    tracing::trace!(id = %self.id(), bytes = chunk.len(), "data received");
                    None
                }
                Err(e) => {
                    tracing::warn!(id = %self.id(), error = %e, "response sink write failed");
                    self.fail_locked(&mut shared, e.into());
                    Some(shared.task.take())
                }
            }
        };

        match failed_task {
            None => self.schedule_progress(),
            Some(task) => {
                if let Some(task) = task {
                    task.cancel();
                }
                self.schedule_complete();
            }
        }
    }

    pub(crate) fn on_upload_progress(&self, sent: u64, expected: Option<u64>) {
        {
            let mut shared = self.lock();
            if !shared.accepts_events() {
                return;
            }
            let progress = &mut shared.progress;
            progress.uploaded = progress.uploaded.max(sent);
            if expected.is_some() {
                progress.upload_expected = expected;
            }
            tracing::trace!(id = %self.id(), sent, "upload progress");
        }
        self.schedule_progress();
    }

    pub(crate) fn on_finish(&self) {
        let flush_failed = {
            let mut shared = self.lock();
            if !shared.accepts_events() {
                return;
            }
            shared.timing.mark_finish();
            match shared.body.finish() {
                Ok(()) => {
                    shared.flags.finished_loading = true;
                    shared.finish_scheduled = true;
                    shared.state.advance(LoadState::FinishedLoading);
                    false
                }
                Err(e) => {
                    tracing::warn!(id = %self.id(), error = %e, "response sink flush failed");
                    self.fail_locked(&mut shared, e.into());
                    true
                }
            }
        };

        if flush_failed {
            self.schedule_complete();
        } else {
            let conn = self.clone();
            self.inner.context.dispatcher().on_primary(move || conn.deliver_finish());
        }
    }

    pub(crate) fn on_fail(&self, error: NetError) {
        {
            let mut shared = self.lock();
            if !shared.accepts_events() {
                return;
            }
            tracing::debug!(id = %self.id(), error = %error, code = error.as_i32(), "transport failed");
            self.fail_locked(&mut shared, error.into());
        }
        self.schedule_complete();
    }

    /// Record a failure. Parse never runs after this.
    fn fail_locked(&self, shared: &mut Shared, error: ConnectionError) {
        shared.timing.mark_finish();
        shared.error = Some(error);
        shared.state.advance(LoadState::Failed);
        shared.finish_scheduled = true;
        shared.completion_scheduled = true;
    }

    // ===== Delivery =====

    fn schedule_progress(&self) {
        let conn = self.clone();
        self.inner.context.dispatcher().on_primary(move || conn.deliver_progress());
    }

    fn schedule_complete(&self) {
        let conn = self.clone();
        self.inner.context.dispatcher().on_primary(move || conn.complete());
    }

    fn deliver_progress(&self) {
        let callback = {
            let shared = self.lock();
            // A progress job that raced behind the finish delivery must not
            // fire once the parse step has been handed to the worker.
            if shared.state.is_terminal() || shared.state == LoadState::Parsing {
                return;
            }
            shared.callbacks.progress.clone()
        };
        if let Some(callback) = callback {
            callback(self);
        }
    }

    fn deliver_finish(&self) {
        let parse = {
            let mut shared = self.lock();
            if shared.completion_scheduled || shared.state.is_terminal() {
                return;
            }
            let parse = shared.callbacks.parse.take();
            match parse {
                Some(_) => {
                    shared.state.advance(LoadState::Parsing);
                }
                None => shared.completion_scheduled = true,
            }
            parse
        };

        match parse {
            None => self.complete(),
            Some(parse) => {
                tracing::debug!(id = %self.id(), "dispatching parse step");
                let conn = self.clone();
                self.inner.context.dispatcher().on_worker(move || conn.run_parse(parse));
            }
        }
    }

    fn run_parse(&self, parse: ParseCallback) {
        let parsed = match catch_unwind(AssertUnwindSafe(|| parse(self))) {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::error!(id = %self.id(), "parse step panicked");
                Parsed::failed(ConnectionError::new(
                    ErrorDomain::Connection,
                    ConnectionErrorCode::Unknown.as_i32(),
                    "parse step panicked",
                ))
            }
        };

        {
            let mut shared = self.lock();
            if shared.completion_scheduled || shared.state.is_terminal() {
                // Expired while parsing; the outcome is discarded.
                return;
            }
            shared.timing.mark_parse();
            shared.parse_result = parsed.result;
            if let Some(error) = parsed.error {
                shared.error = Some(error);
            }
            shared.completion_scheduled = true;
        }
        self.schedule_complete();
    }

    fn complete(&self) {
        let (callbacks, task, background, succeeded) = {
            let mut shared = self.lock();
            if shared.state.is_terminal() {
                return;
            }
            shared.flags.completed = true;
            shared.flags.succeeded = shared.error.is_none();
            shared.state.advance(LoadState::Completed);
            (
                shared.callbacks.take(),
                shared.task.take(),
                shared.background.take(),
                shared.flags.succeeded,
            )
        };

        self.inner.context.registry().remove(self.id());
        self.end_background(background);
        drop(task);
        tracing::debug!(id = %self.id(), succeeded, "connection completed");

        let Callbacks {
            completion,
            progress,
            parse,
        } = callbacks;
        drop((progress, parse));
        if let Some(completion) = completion {
            completion(self);
        }
    }

    // ===== Background guard =====

    fn begin_background(&self) {
        let Some(guard) = self.inner.context.background() else {
            return;
        };
        let weak = self.downgrade();
        let label = format!("urlconn {}", self.id());
        let id = guard.begin(
            &label,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Connection { inner }.expire_in_background();
                }
            }),
        );

        let mut shared = self.lock();
        if shared.state.is_terminal() {
            drop(shared);
            guard.end(id);
        } else {
            shared.background = Some(id);
        }
    }

    fn end_background(&self, id: Option<BackgroundTaskId>) {
        if let (Some(id), Some(guard)) = (id, self.inner.context.background()) {
            guard.end(id);
        }
    }

    /// Fail with `ExpiredInBackground`, skipping any pending parse step.
    fn expire_in_background(&self) {
        let (task, background) = {
            let mut shared = self.lock();
            if shared.state.is_terminal() || shared.completion_scheduled {
                return;
            }
            tracing::warn!(id = %self.id(), "background time expired before completion");
            shared.timing.mark_finish();
            shared.error = Some(ConnectionError::expired_in_background());
            shared.finish_scheduled = true;
            shared.completion_scheduled = true;
            (shared.task.take(), shared.background.take())
        };

        if let Some(task) = task {
            task.cancel();
        }
        self.end_background(background);
        self.schedule_complete();
    }

    // ===== Accessors =====

    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    pub fn context(&self) -> &ConnectionContext {
        &self.inner.context
    }

    pub fn request(&self) -> &RequestConfig {
        &self.inner.config
    }

    pub fn url(&self) -> &str {
        &self.inner.config.url
    }

    pub fn method(&self) -> RequestMethod {
        self.inner.config.method
    }

    pub fn load_state(&self) -> LoadState {
        self.lock().state
    }

    pub fn response(&self) -> Option<ResponseHead> {
        self.lock().response.clone()
    }

    /// HTTP status, or -1 before a response or for non-HTTP responses.
    pub fn status_code(&self) -> i32 {
        self.lock()
            .response
            .as_ref()
            .map_or(-1, |head| i32::from(head.status().as_u16()))
    }

    pub fn response_headers(&self) -> Option<http::HeaderMap> {
        self.lock().response.as_ref().map(|head| head.headers().clone())
    }

    /// Buffered body; `None` when a response sink was configured.
    pub fn response_data(&self) -> Option<Bytes> {
        self.lock().body.data()
    }

    pub fn has_response_sink(&self) -> bool {
        self.lock().body.is_sink()
    }

    pub fn parse_result(&self) -> Option<ParseResult> {
        self.lock().parse_result.clone()
    }

    /// The parse result, if it is a `T`.
    pub fn parse_result_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.parse_result()?.downcast::<T>().ok()
    }

    pub fn error(&self) -> Option<ConnectionError> {
        self.lock().error.clone()
    }

    pub fn is_started(&self) -> bool {
        self.lock().flags.started
    }

    pub fn is_finished_loading(&self) -> bool {
        self.lock().flags.finished_loading
    }

    pub fn is_completed(&self) -> bool {
        self.lock().flags.completed
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().state == LoadState::Cancelled
    }

    pub fn succeeded(&self) -> bool {
        self.lock().flags.succeeded
    }

    pub fn progress(&self) -> Progress {
        self.lock().progress
    }

    pub fn bytes_uploaded(&self) -> u64 {
        self.lock().progress.uploaded
    }

    pub fn bytes_downloaded(&self) -> u64 {
        self.lock().progress.downloaded
    }

    /// Fraction of the request body sent, 0.0 when the size is unknown.
    pub fn upload_progress(&self) -> f32 {
        self.lock().progress.upload_fraction()
    }

    /// Fraction of the response body received, 0.0 when the size is unknown.
    pub fn download_progress(&self) -> f32 {
        self.lock().progress.download_fraction()
    }

    /// Active connections, this one included, when it started.
    pub fn concurrency_at_start(&self) -> usize {
        self.lock().concurrency_at_start
    }

    pub fn timing(&self) -> Timing {
        self.lock().timing
    }

    pub fn start_time(&self) -> Option<Instant> {
        self.lock().timing.started_at
    }

    pub fn time_to_challenge(&self) -> Option<Duration> {
        self.lock().timing.challenge
    }

    pub fn time_to_first_response(&self) -> Option<Duration> {
        self.lock().timing.first_response
    }

    pub fn time_to_finish(&self) -> Option<Duration> {
        self.lock().timing.finish_or_fail
    }

    pub fn time_to_parse(&self) -> Option<Duration> {
        self.lock().timing.parse_complete
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.lock();
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("method", &self.inner.config.method)
            .field("url", &self.inner.config.url)
            .field("state", &shared.state)
            .field(
                "status",
                &shared.response.as_ref().map(|head| head.status().as_u16()),
            )
            .field("error", &shared.error)
            .field("progress", &shared.progress)
            .finish()
    }
}
