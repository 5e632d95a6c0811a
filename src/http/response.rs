//! Response metadata delivered by the transport.

use http::{HeaderMap, StatusCode, Version};

/// Status line and headers of a response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
}

impl ResponseHead {
    pub fn new(status: StatusCode, version: Version, headers: HeaderMap) -> Self {
        Self {
            status,
            version,
            headers,
        }
    }

    pub fn from_parts(parts: &http::response::Parts) -> Self {
        Self::new(parts.status, parts.version, parts.headers.clone())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// `Content-Length`, when present and well-formed.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(http::header::CONTENT_LENGTH)?
            .to_str()
            .ok()?
            .trim()
            .parse()
            .ok()
    }

    pub fn status_class(&self) -> StatusClass {
        StatusClass::from_code(i32::from(self.status.as_u16()))
    }
}

/// HTTP/1.1 status code classes.
///
/// Purely informational: a non-2xx status does not fail a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    Unknown,
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
}

impl StatusClass {
    pub fn from_code(code: i32) -> Self {
        match code {
            100..=199 => StatusClass::Informational,
            200..=299 => StatusClass::Success,
            300..=399 => StatusClass::Redirection,
            400..=499 => StatusClass::ClientError,
            500..=599 => StatusClass::ServerError,
            _ => StatusClass::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_length() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_LENGTH, "1024".parse().unwrap());
        let head = ResponseHead::new(StatusCode::OK, Version::HTTP_11, headers);
        assert_eq!(head.content_length(), Some(1024));
    }

    #[test]
    fn test_missing_content_length() {
        let head = ResponseHead::new(StatusCode::OK, Version::HTTP_11, HeaderMap::new());
        assert_eq!(head.content_length(), None);
    }

    #[test]
    fn test_status_classes() {
        assert_eq!(StatusClass::from_code(101), StatusClass::Informational);
        assert_eq!(StatusClass::from_code(204), StatusClass::Success);
        assert_eq!(StatusClass::from_code(304), StatusClass::Redirection);
        assert_eq!(StatusClass::from_code(404), StatusClass::ClientError);
        assert_eq!(StatusClass::from_code(503), StatusClass::ServerError);
        assert_eq!(StatusClass::from_code(-1), StatusClass::Unknown);
    }
}
