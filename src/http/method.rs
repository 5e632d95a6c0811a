use std::fmt;

/// Request methods supported by connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum RequestMethod {
    #[default]
    Get = 0,
    Post = 1,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
        }
    }

    /// Whether parameters travel in the body rather than the query string.
    pub fn has_body(&self) -> bool {
        matches!(self, RequestMethod::Post)
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RequestMethod> for http::Method {
    fn from(method: RequestMethod) -> Self {
        match method {
            RequestMethod::Get => http::Method::GET,
            RequestMethod::Post => http::Method::POST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_get() {
        assert_eq!(RequestMethod::default(), RequestMethod::Get);
        assert_eq!(RequestMethod::Get as u8, 0);
        assert_eq!(RequestMethod::Post as u8, 1);
    }

    #[test]
    fn test_strings() {
        assert_eq!(RequestMethod::Post.to_string(), "POST");
        assert_eq!(http::Method::from(RequestMethod::Get), http::Method::GET);
    }
}
