//! Shared configuration and collaborators for connections.
//!
//! A [`ConnectionContext`] bundles the executors, the transport, the
//! registry and the background guard. It is created once per application
//! and cloned freely; every connection keeps a handle to the context it was
//! built from.

use super::callbacks::{Callbacks, Parsed};
use super::registry::ConnectionRegistry;
use super::Connection;
use crate::background::BackgroundGuard;
use crate::base::error::StartError;
use crate::dispatch::{BlockingExecutor, Dispatcher, Executor, SerialExecutor};
use crate::http::method::RequestMethod;
use crate::http::payload::Payload;
use crate::http::request::RequestConfig;
use crate::transport::{HyperTransport, TlsConfig, Transport, DEFAULT_UPLOAD_CHUNK_SIZE};
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;

/// Configuration shared by every connection of a context.
#[derive(Clone)]
pub struct ContextConfig {
    /// Sent as `User-Agent` unless a connection overrides it.
    pub user_agent: String,

    /// Sent on every request, after `User-Agent` and before caller headers.
    pub default_headers: Vec<(String, String)>,

    /// Overall per-request limit enforced by the default transport.
    pub timeout: Option<Duration>,

    /// Whether POST requests run under the background guard unless a
    /// connection says otherwise. GET requests never do by default.
    pub background_for_post: bool,

    /// Request body chunk size; one upload progress event per chunk.
    pub upload_chunk_size: usize,

    /// TLS settings for the default transport.
    pub tls: TlsConfig,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("urlconn/", env!("CARGO_PKG_VERSION")).to_string(),
            default_headers: Vec::new(),
            timeout: Some(Duration::from_secs(60)),
            background_for_post: true,
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
            tls: TlsConfig::default(),
        }
    }
}

impl ContextConfig {
    /// Headers every request starts from.
    pub fn header_defaults(&self) -> Vec<(String, String)> {
        let mut headers = Vec::with_capacity(self.default_headers.len() + 1);
        if !self.user_agent.is_empty() {
            headers.push(("User-Agent".to_string(), self.user_agent.clone()));
        }
        headers.extend(self.default_headers.iter().cloned());
        headers
    }

    pub fn runs_in_background(&self, method: RequestMethod) -> bool {
        match method {
            RequestMethod::Get => false,
            RequestMethod::Post => self.background_for_post,
        }
    }
}

impl fmt::Debug for ContextConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextConfig")
            .field("user_agent", &self.user_agent)
            .field("default_headers_count", &self.default_headers.len())
            .field("timeout", &self.timeout)
            .field("background_for_post", &self.background_for_post)
            .field("upload_chunk_size", &self.upload_chunk_size)
            .field("tls", &self.tls)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("no tokio runtime available for the default transport")]
    NoRuntime,
    #[error("failed to spawn executor thread: {0}")]
    Spawn(#[from] io::Error),
}

struct ContextInner {
    dispatcher: Dispatcher,
    transport: Arc<dyn Transport>,
    registry: Arc<ConnectionRegistry>,
    background: Option<Arc<dyn BackgroundGuard>>,
    config: ContextConfig,
}

#[derive(Clone)]
pub struct ConnectionContext {
    inner: Arc<ContextInner>,
}

impl ConnectionContext {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    pub fn config(&self) -> &ContextConfig {
        &self.inner.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.inner.registry
    }

    pub fn background(&self) -> Option<&Arc<dyn BackgroundGuard>> {
        self.inner.background.as_ref()
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    pub fn get<U: Into<String>>(&self, url: U) -> ConnectionBuilder {
        self.connection(RequestMethod::Get, url)
    }

    pub fn post<U: Into<String>>(&self, url: U) -> ConnectionBuilder {
        self.connection(RequestMethod::Post, url)
    }

    pub fn connection<U: Into<String>>(&self, method: RequestMethod, url: U) -> ConnectionBuilder {
        self.with_config(RequestConfig::new(method, url))
    }

    /// Start from a prepared request configuration.
    pub fn with_config(&self, config: RequestConfig) -> ConnectionBuilder {
        ConnectionBuilder {
            context: self.clone(),
            config,
            callbacks: Callbacks::default(),
            sink: None,
        }
    }

    /// Cancel everything registered with this context's registry.
    pub fn cancel_all(&self) -> usize {
        self.inner.registry.cancel_all()
    }
}

impl fmt::Debug for ConnectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionContext")
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .field("background", &self.inner.background.is_some())
            .finish()
    }
}

/// Builder for [`ConnectionContext`].
///
/// Unset collaborators default to: a dedicated primary thread, the tokio
/// blocking pool as worker (or a second dedicated thread outside a runtime),
/// [`HyperTransport`] on the given or current runtime, and a fresh registry.
#[derive(Default)]
pub struct ContextBuilder {
    primary: Option<Arc<dyn Executor>>,
    worker: Option<Arc<dyn Executor>>,
    transport: Option<Arc<dyn Transport>>,
    registry: Option<Arc<ConnectionRegistry>>,
    background: Option<Arc<dyn BackgroundGuard>>,
    runtime: Option<Handle>,
    config: ContextConfig,
}

impl ContextBuilder {
    /// Executor for progress and completion callbacks.
    pub fn primary(mut self, executor: Arc<dyn Executor>) -> Self {
        self.primary = Some(executor);
        self
    }

    /// Executor for parse steps.
    pub fn worker(mut self, executor: Arc<dyn Executor>) -> Self {
        self.worker = Some(executor);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Share a registry between contexts.
    pub fn registry(mut self, registry: Arc<ConnectionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn background(mut self, guard: Arc<dyn BackgroundGuard>) -> Self {
        self.background = Some(guard);
        self
    }

    /// Runtime for the default transport and worker.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ConnectionContext, ContextError> {
        let runtime = self.runtime.or_else(|| Handle::try_current().ok());

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => {
                let handle = runtime.clone().ok_or(ContextError::NoRuntime)?;
                Arc::new(
                    HyperTransport::new(handle)
                        .tls(self.config.tls.clone())
                        .timeout(self.config.timeout)
                        .upload_chunk_size(self.config.upload_chunk_size),
                )
            }
        };

        let primary: Arc<dyn Executor> = match self.primary {
            Some(primary) => primary,
            None => Arc::new(SerialExecutor::spawn("urlconn-primary")?),
        };

        let worker: Arc<dyn Executor> = match (self.worker, runtime) {
            (Some(worker), _) => worker,
            (None, Some(handle)) => Arc::new(BlockingExecutor::new(handle)),
            (None, None) => Arc::new(SerialExecutor::spawn("urlconn-worker")?),
        };

        tracing::debug!(config = ?self.config, "connection context built");

        Ok(ConnectionContext {
            inner: Arc::new(ContextInner {
                dispatcher: Dispatcher::new(primary, worker),
                transport,
                registry: self.registry.unwrap_or_default(),
                background: self.background,
                config: self.config,
            }),
        })
    }
}

/// Builder for a single connection.
pub struct ConnectionBuilder {
    context: ConnectionContext,
    config: RequestConfig,
    callbacks: Callbacks,
    sink: Option<Box<dyn Write + Send>>,
}

impl ConnectionBuilder {
    /// Add a header; a later value for the same name replaces the earlier.
    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.config.headers.push((key.into(), value.into()));
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.config.headers.extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Query parameter for GET, form field for POST.
    pub fn parameter<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.config.parameters.insert(key.into(), value.into());
        self
    }

    pub fn parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.config.parameters.extend(parameters.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Attach a file part; the POST body becomes multipart.
    pub fn file_part<N: Into<String>>(mut self, name: N, payload: Payload) -> Self {
        self.config.file_parts.push((name.into(), payload));
        self
    }

    /// Use `payload` as the POST body instead of encoded parameters.
    pub fn payload(mut self, payload: Payload) -> Self {
        self.config.payload = Some(payload);
        self
    }

    pub fn run_in_background(mut self, enabled: bool) -> Self {
        self.config.run_in_background = Some(enabled);
        self
    }

    /// Stream the body into `sink` instead of buffering it.
    pub fn response_sink<W: Write + Send + 'static>(mut self, sink: W) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(&Connection) + Send + Sync + 'static,
    {
        self.callbacks.progress = Some(Arc::new(f));
        self
    }

    /// Post-process a successful response on the worker executor. Return a
    /// [`Parsed`], or a `Result<T, ConnectionError>`.
    pub fn on_parse<F, R>(mut self, f: F) -> Self
    where
        F: FnOnce(&Connection) -> R + Send + 'static,
        R: Into<Parsed>,
    {
        self.callbacks.parse = Some(Box::new(move |conn: &Connection| f(conn).into()));
        self
    }

    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Connection) + Send + 'static,
    {
        self.callbacks.completion = Some(Box::new(f));
        self
    }

    /// An idle connection, not yet registered.
    pub fn build(self) -> Connection {
        Connection::new(self.context, self.config, self.callbacks, self.sink)
    }

    pub fn start(self) -> Result<Connection, StartError> {
        self.build().start()
    }
}

impl fmt::Debug for ConnectionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionBuilder")
            .field("config", &self.config)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_defaults_order() {
        let config = ContextConfig {
            user_agent: "ua/1".into(),
            default_headers: vec![("Accept".into(), "*/*".into())],
            ..Default::default()
        };
        let headers = config.header_defaults();
        assert_eq!(headers[0], ("User-Agent".to_string(), "ua/1".to_string()));
        assert_eq!(headers[1].0, "Accept");
    }

    #[test]
    fn test_background_defaults() {
        let config = ContextConfig::default();
        assert!(config.runs_in_background(RequestMethod::Post));
        assert!(!config.runs_in_background(RequestMethod::Get));
        assert_eq!(config.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_build_without_runtime_needs_transport() {
        let err = ConnectionContext::builder().build().unwrap_err();
        assert!(matches!(err, ContextError::NoRuntime));
    }
}
