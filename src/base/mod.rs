//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): transport error codes matching `net_error_list.h`
//! - [`ConnectionError`](error::ConnectionError): the tagged error delivered at completion
//! - [`LoadState`](loadstate::LoadState): the connection lifecycle states

pub mod context;
pub mod error;
pub mod loadstate;
pub mod neterror;

#[cfg(test)]
mod tests;
