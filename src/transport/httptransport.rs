use crate::base::neterror::NetError;
use crate::connection::EventSink;
use crate::http::request::WireRequest;
use crate::http::response::ResponseHead;
use crate::transport::connectjob::ConnectJob;
use crate::transport::tls::TlsConfig;
use crate::transport::uploadbody::UploadBody;
use crate::transport::{AbortOnCancel, Transport, TransportTask};
use http::header::{CONTENT_LENGTH, HOST, PROXY_AUTHENTICATE, WWW_AUTHENTICATE};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone)]
struct Settings {
    tls: TlsConfig,
    timeout: Option<Duration>,
    upload_chunk_size: usize,
}

/// HTTP/1.1 over TCP or BoringSSL, one connection per request.
///
/// No redirects, retries or caching: every response, whatever its status,
/// is delivered to the connection as is.
#[derive(Debug, Clone)]
pub struct HyperTransport {
    handle: Handle,
    settings: Arc<Settings>,
}

impl HyperTransport {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            settings: Arc::new(Settings {
                tls: TlsConfig::default(),
                timeout: None,
                upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
            }),
        }
    }

    /// Use the runtime the caller is running in, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    pub fn tls(mut self, tls: TlsConfig) -> Self {
        Arc::make_mut(&mut self.settings).tls = tls;
        self
    }

    /// Overall limit on connect + exchange, reported as `ConnectionTimedOut`.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        Arc::make_mut(&mut self.settings).timeout = timeout;
        self
    }

    pub fn upload_chunk_size(mut self, size: usize) -> Self {
        Arc::make_mut(&mut self.settings).upload_chunk_size = size.max(1);
        self
    }
}

impl Transport for HyperTransport {
    fn begin(&self, request: WireRequest, sink: EventSink) -> Box<dyn TransportTask> {
        let settings = self.settings.clone();
        let handle = self.handle.spawn(run(settings, request, sink));
        Box::new(AbortOnCancel::new(handle))
    }
}

async fn run(settings: Arc<Settings>, request: WireRequest, sink: EventSink) {
    let fut = exchange(&settings, request, &sink);
    let outcome = match settings.timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(outcome) => outcome,
            Err(_) => Err(NetError::ConnectionTimedOut),
        },
        None => fut.await,
    };

    match outcome {
        Ok(()) => sink.finish(),
        Err(e) => sink.fail(e),
    }
}

async fn exchange(
    settings: &Settings,
    request: WireRequest,
    sink: &EventSink,
) -> Result<(), NetError> {
    let socket = ConnectJob::connect(&request.url, &settings.tls, sink).await?;

    let (mut sender, conn) =
        http1::handshake(TokioIo::new(socket)).await.map_err(|e| NetError::from_hyper(&e))?;
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!(error = %e, "connection driver exited");
        }
    });

    let req = encode(request, settings.upload_chunk_size, sink)?;
    let response = sender.send_request(req).await.map_err(|e| NetError::from_hyper(&e))?;
    let (parts, mut body) = response.into_parts();

    if is_auth_challenge(parts.status, &parts.headers) {
        // Proceed without credentials; the status reaches the caller as is.
        sink.challenge();
    }
    sink.response(ResponseHead::from_parts(&parts));

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| NetError::from_hyper(&e))?;
        if let Ok(data) = frame.into_data() {
            if !data.is_empty() {
                sink.data(data);
            }
        }
    }
    Ok(())
}

fn encode(
    request: WireRequest,
    chunk_size: usize,
    sink: &EventSink,
) -> Result<Request<UploadBody>, NetError> {
    let target = request.path_and_query();
    let WireRequest {
        method,
        url,
        mut headers,
        body,
    } = request;

    let host = url.host_str().ok_or(NetError::InvalidUrl)?;
    let authority = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    headers.insert_default(HOST.as_str(), &authority).map_err(|_| NetError::InvalidUrl)?;
    if method.has_body() {
        headers
            .insert_default(CONTENT_LENGTH.as_str(), &body.len().to_string())
            .map_err(|_| NetError::InvalidUrl)?;
    }

    let reporter = sink.upload_reporter();
    let upload = UploadBody::new(body.data(), chunk_size)
        .on_progress(move |sent, total| reporter.report(sent, Some(total)));

    let mut req = Request::builder()
        .method(http::Method::from(method))
        .uri(target)
        .body(upload)
        .map_err(|_| NetError::InvalidUrl)?;
    *req.headers_mut() = headers.to_header_map();
    Ok(req)
}

fn is_auth_challenge(status: StatusCode, headers: &http::HeaderMap) -> bool {
    match status {
        StatusCode::UNAUTHORIZED => headers.contains_key(WWW_AUTHENTICATE),
        StatusCode::PROXY_AUTHENTICATION_REQUIRED => headers.contains_key(PROXY_AUTHENTICATE),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_challenge_detection() {
        let mut headers = http::HeaderMap::new();
        assert!(!is_auth_challenge(StatusCode::UNAUTHORIZED, &headers));

        headers.insert(WWW_AUTHENTICATE, "Basic realm=\"x\"".parse().unwrap());
        assert!(is_auth_challenge(StatusCode::UNAUTHORIZED, &headers));
        assert!(!is_auth_challenge(StatusCode::OK, &headers));
        assert!(!is_auth_challenge(StatusCode::PROXY_AUTHENTICATION_REQUIRED, &headers));
    }
}
