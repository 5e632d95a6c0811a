use thiserror::Error;

/// Declares the transport code table once: the enum, its messages and both
/// directions of the integer mapping.
macro_rules! net_errors {
    ($( $variant:ident = $code:literal => $message:literal, )+) => {
        /// Transport-level failure codes.
        ///
        /// Values follow Chromium's `net_error_list.h` numbering so they stay
        /// stable across adapters. A code outside this table survives as
        /// [`NetError::Unknown`].
        #[derive(Debug, Error, PartialEq, Eq, Clone, Copy, Hash)]
        pub enum NetError {
            $(
                #[error($message)]
                $variant,
            )+
            #[error("transport error {0}")]
            Unknown(i32),
        }

        impl NetError {
            pub fn as_i32(&self) -> i32 {
                match self {
                    $( NetError::$variant => $code, )+
                    NetError::Unknown(code) => *code,
                }
            }
        }

        impl From<i32> for NetError {
            fn from(code: i32) -> Self {
                match code {
                    $( $code => NetError::$variant, )+
                    other => NetError::Unknown(other),
                }
            }
        }
    };
}

net_errors! {
    Aborted = -3 => "request aborted",

    // Connect phase (-100..-199)
    ConnectionClosed = -100 => "connection closed by peer",
    ConnectionReset = -101 => "connection reset by peer",
    ConnectionRefused = -102 => "connection refused",
    ConnectionAborted = -103 => "connection aborted",
    ConnectionFailed = -104 => "connection failed",
    NameNotResolved = -105 => "host name not resolved",
    SslProtocolError = -107 => "TLS handshake failed",
    AddressInvalid = -108 => "address not available",
    ConnectionTimedOut = -118 => "timed out",
    NetworkAccessDenied = -138 => "network access denied",
    AddressInUse = -147 => "address already in use",

    // Certificates (-200..-299)
    CertAuthorityInvalid = -202 => "server certificate not trusted",

    // Request and response (-300..-399)
    InvalidUrl = -300 => "malformed URL",
    DisallowedUrlScheme = -301 => "URL scheme not allowed",
    EmptyResponse = -324 => "server closed without a response",
    ContentLengthMismatch = -354 => "body shorter than Content-Length",
    InvalidHttpResponse = -370 => "malformed HTTP response",
}

impl NetError {
    /// Whether the failure happened before any byte reached the server.
    pub fn is_connect_error(&self) -> bool {
        let code = self.as_i32();
        (-199..=-100).contains(&code) && *self != NetError::ConnectionClosed
    }

    /// Classify a hyper client error.
    pub fn from_hyper(error: &hyper::Error) -> Self {
        if error.is_timeout() {
            NetError::ConnectionTimedOut
        } else if error.is_canceled() {
            NetError::Aborted
        } else if error.is_incomplete_message() {
            NetError::EmptyResponse
        } else if error.is_parse() || error.is_parse_status() {
            NetError::InvalidHttpResponse
        } else if error.is_closed() {
            NetError::ConnectionClosed
        } else {
            NetError::ConnectionFailed
        }
    }

    /// Classify an I/O error by its kind.
    pub fn from_io(error: &std::io::Error) -> Self {
        use std::io::ErrorKind::*;

        match error.kind() {
            ConnectionRefused => NetError::ConnectionRefused,
            ConnectionReset => NetError::ConnectionReset,
            ConnectionAborted => NetError::ConnectionAborted,
            NotConnected | BrokenPipe => NetError::ConnectionClosed,
            AddrInUse => NetError::AddressInUse,
            AddrNotAvailable => NetError::AddressInvalid,
            TimedOut => NetError::ConnectionTimedOut,
            PermissionDenied => NetError::NetworkAccessDenied,
            UnexpectedEof => NetError::EmptyResponse,
            _ => NetError::ConnectionFailed,
        }
    }
}
