//! Request body for POST operations.

use bytes::Bytes;

/// Encoded request body together with the content type that describes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    /// No body (GET).
    #[default]
    Empty,
    /// Encoded bytes.
    Bytes { data: Bytes, content_type: String },
}

impl RequestBody {
    pub fn new<B: Into<Bytes>, S: Into<String>>(data: B, content_type: S) -> Self {
        RequestBody::Bytes {
            data: data.into(),
            content_type: content_type.into(),
        }
    }

    /// `application/x-www-form-urlencoded` body from an encoded query.
    pub fn form(encoded: String) -> Self {
        Self::new(encoded, "application/x-www-form-urlencoded")
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        match self {
            RequestBody::Empty => 0,
            RequestBody::Bytes { data, .. } => data.len(),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Bytes { content_type, .. } => Some(content_type),
        }
    }

    /// The raw bytes, empty for `Empty`.
    pub fn data(&self) -> Bytes {
        match self {
            RequestBody::Empty => Bytes::new(),
            RequestBody::Bytes { data, .. } => data.clone(),
        }
    }
}
