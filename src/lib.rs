//! # urlconn
//!
//! An asynchronous HTTP request engine with an explicit per-request
//! lifecycle.
//!
//! `urlconn` issues a request, tracks upload and download progress, collects
//! the response into memory or a caller-supplied writer, optionally runs a
//! parse step off the delivery thread, and invokes exactly one completion
//! callback once the request resolves. A registry of in-flight connections
//! lets a host enumerate or cancel all outstanding work.
//!
//! ## Features
//!
//! - **Lifecycle**: monotonic load states, exactly-once completion, race-aware
//!   cancellation
//! - **Threading**: progress/completion on a primary executor, parsing on a
//!   worker executor, both injected
//! - **Registry**: weak membership, cancel-all, activity began/ended events
//! - **Transport**: HTTP/1.1 over TCP or BoringSSL via `hyper`, or any
//!   [`Transport`] implementation
//! - **Bodies**: URL-encoded forms, multipart with file parts, raw payloads
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use urlconn::ConnectionContext;
//! use urlconn::http::decode::json_dictionary;
//!
//! let context = ConnectionContext::builder().build()?;
//! context
//!     .get("https://api.example.com/venues")
//!     .parameter("q", "coffee")
//!     .on_parse(|conn| json_dictionary(&conn.response_data().unwrap_or_default()))
//!     .on_complete(|conn| println!("{} -> {:?}", conn.status_code(), conn.error()))
//!     .start()?;
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error codes, load states and IO error context
//! - [`http`] - Request building, headers, bodies, payloads, response metadata
//! - [`transport`] - Transport boundary and the default hyper transport
//! - [`dispatch`] - Primary and worker executors
//! - [`connection`] - State machine, callbacks, registry and context
//! - [`background`] - Background-execution guard

pub mod background;
pub mod base;
pub mod connection;
pub mod dispatch;
pub mod http;
pub mod transport;

pub use background::{BackgroundGuard, BackgroundTaskId, ManualBackgroundGuard};
pub use base::error::{ConnectionError, ConnectionErrorCode, ErrorDomain, StartError};
pub use base::loadstate::LoadState;
pub use base::neterror::NetError;
pub use connection::{
    ActivityEvent, Connection, ConnectionBuilder, ConnectionContext, ConnectionId,
    ConnectionRegistry, ContextConfig, ContextError, EventSink, Parsed,
};
pub use dispatch::{Dispatcher, Executor, MainQueue};
pub use http::{MimeType, Payload, RequestMethod};
pub use transport::{HyperTransport, Transport, TransportTask};
