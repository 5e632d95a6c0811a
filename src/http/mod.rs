pub mod decode;
pub mod encoding;
pub mod method;
pub mod multipart;
pub mod orderedheaders;
pub mod payload;
pub mod request;
pub mod requestbody;
pub mod response;

// Re-exports for convenience
pub use method::RequestMethod;
pub use orderedheaders::OrderedHeaderMap;
pub use payload::{MimeType, Payload};
pub use request::{RequestConfig, WireRequest};
pub use requestbody::RequestBody;
pub use response::{ResponseHead, StatusClass};
