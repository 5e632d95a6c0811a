//! Error values surfaced by connections.
//!
//! Every asynchronous failure reaches the caller as a [`ConnectionError`]:
//! a flat `(domain, code, message, source)` value read from the connection
//! at completion time. Synchronous `start()` failures use [`StartError`].

use crate::base::neterror::NetError;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Codes in the [`ErrorDomain::Connection`] domain.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ConnectionErrorCode {
    #[error("unknown connection error")]
    Unknown = 0,
    /// A structured-data body decoded to a root of the wrong kind,
    /// e.g. an array where an object was expected.
    #[error("unexpected JSON root type")]
    JsonResultType = 1,
    /// The host expired the background execution token before completion.
    #[error("expired while running in background")]
    ExpiredInBackground = 2,
}

impl ConnectionErrorCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::JsonResultType),
            2 => Some(Self::ExpiredInBackground),
            _ => None,
        }
    }
}

/// The namespace an error code belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorDomain {
    /// Errors raised by the engine itself ([`ConnectionErrorCode`]).
    Connection,
    /// Failures reported by the transport adapter ([`NetError`] codes).
    Transport,
    /// JSON decoding failures; the code is the serde_json error category.
    Json,
    /// Failures writing the response into a caller-supplied sink.
    Io,
    /// Caller-defined domain, typically raised from a parse step.
    Custom(Cow<'static, str>),
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDomain::Connection => f.write_str("urlconn.connection"),
            ErrorDomain::Transport => f.write_str("urlconn.transport"),
            ErrorDomain::Json => f.write_str("json"),
            ErrorDomain::Io => f.write_str("io"),
            ErrorDomain::Custom(name) => f.write_str(name),
        }
    }
}

/// A tagged error value: domain, code, message and an optional cause.
///
/// Equality compares domain, code and message; the underlying cause is
/// diagnostic only.
#[derive(Clone)]
pub struct ConnectionError {
    domain: ErrorDomain,
    code: i32,
    message: Cow<'static, str>,
    source: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ConnectionError {
    pub fn new(domain: ErrorDomain, code: i32, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            domain,
            code,
            message: message.into(),
            source: None,
        }
    }

    /// An error in a caller-defined domain.
    pub fn custom(
        domain: impl Into<Cow<'static, str>>,
        code: i32,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new(ErrorDomain::Custom(domain.into()), code, message)
    }

    /// An error in the engine's own domain.
    pub fn connection(code: ConnectionErrorCode) -> Self {
        Self::new(ErrorDomain::Connection, code.as_i32(), code.to_string())
    }

    pub fn json_result_type(expected: &'static str) -> Self {
        Self::new(
            ErrorDomain::Connection,
            ConnectionErrorCode::JsonResultType.as_i32(),
            format!("unexpected JSON root type; expected {}", expected),
        )
    }

    pub fn expired_in_background() -> Self {
        Self::connection(ConnectionErrorCode::ExpiredInBackground)
    }

    /// Attach the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn domain(&self) -> &ErrorDomain {
        &self.domain
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The transport error, if this error came from the transport.
    pub fn net_error(&self) -> Option<NetError> {
        match self.domain {
            ErrorDomain::Transport => Some(NetError::from(self.code)),
            _ => None,
        }
    }

    /// The engine error code, if this error is in the connection domain.
    pub fn connection_code(&self) -> Option<ConnectionErrorCode> {
        match self.domain {
            ErrorDomain::Connection => ConnectionErrorCode::from_i32(self.code),
            _ => None,
        }
    }

    pub fn is(&self, code: ConnectionErrorCode) -> bool {
        self.connection_code() == Some(code)
    }
}

impl From<NetError> for ConnectionError {
    fn from(error: NetError) -> Self {
        Self::new(ErrorDomain::Transport, error.as_i32(), error.to_string())
    }
}

impl From<ConnectionErrorCode> for ConnectionError {
    fn from(code: ConnectionErrorCode) -> Self {
        Self::connection(code)
    }
}

impl From<serde_json::Error> for ConnectionError {
    fn from(error: serde_json::Error) -> Self {
        use serde_json::error::Category;

        let code = match error.classify() {
            Category::Io => 0,
            Category::Syntax => 1,
            Category::Data => 2,
            Category::Eof => 3,
        };
        Self::new(ErrorDomain::Json, code, error.to_string()).with_source(error)
    }
}

impl From<std::io::Error> for ConnectionError {
    fn from(error: std::io::Error) -> Self {
        let code = error.raw_os_error().unwrap_or(-1);
        Self::new(ErrorDomain::Io, code, error.to_string()).with_source(error)
    }
}

impl PartialEq for ConnectionError {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain && self.code == other.code && self.message == other.message
    }
}

impl Eq for ConnectionError {}

impl fmt::Debug for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionError")
            .field("domain", &self.domain)
            .field("code", &self.code)
            .field("message", &self.message)
            .field("source", &self.source.as_ref().map(|s| s.to_string()))
            .finish()
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error {}: {}", self.domain, self.code, self.message)
    }
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Synchronous failures of `Connection::start`. No callback fires for these
/// and the connection is never registered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error("missing target URL")]
    MissingUrl,
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("connection already started or cancelled")]
    NotIdle,
}

impl StartError {
    /// The equivalent transport code, for callers that log numeric codes.
    pub fn as_net_error(&self) -> NetError {
        match self {
            StartError::MissingUrl | StartError::InvalidUrl(_) => NetError::InvalidUrl,
            StartError::UnsupportedScheme(_) => NetError::DisallowedUrlScheme,
            StartError::InvalidHeader(_) => NetError::InvalidUrl,
            StartError::NotIdle => NetError::Aborted,
        }
    }
}
