//! `multipart/form-data` framing (RFC 7578) for uploads that carry file
//! parts next to ordinary parameters.
//!
//! # Example
//! ```ignore
//! use urlconn::http::multipart::{Form, Part};
//!
//! let form = Form::new()
//!     .text("venueId", "42")
//!     .part("photo", Part::bytes(jpeg).file_name("photo.jpg").content_type("image/jpeg"));
//! let content_type = form.content_type();
//! let body = form.into_body();
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use std::sync::atomic::{AtomicU64, Ordering};

/// A multipart form.
#[derive(Debug)]
pub struct Form {
    boundary: String,
    fields: Vec<(String, Part)>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Use a fixed boundary. The caller guarantees it does not occur in any
    /// part body.
    pub fn with_boundary<S: Into<String>>(boundary: S) -> Self {
        Self {
            boundary: boundary.into(),
            fields: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Add a text field.
    pub fn text<N: Into<String>, V: Into<String>>(self, name: N, value: V) -> Self {
        self.part(name, Part::text(value))
    }

    pub fn part<N: Into<String>>(mut self, name: N, part: Part) -> Self {
        self.fields.push((name.into(), part));
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Exact length of [`Form::into_body`]'s output.
    pub fn content_length(&self) -> usize {
        if self.fields.is_empty() {
            return 0;
        }
        let delimiter = 2 + self.boundary.len() + 2;
        let parts: usize = self
            .fields
            .iter()
            .map(|(name, part)| delimiter + part.headers(name).len() + 4 + part.data.len() + 2)
            .sum();
        parts + 2 + self.boundary.len() + 4
    }

    pub fn into_body(self) -> Bytes {
        if self.fields.is_empty() {
            return Bytes::new();
        }

        let mut out = BytesMut::with_capacity(self.content_length());
        for (name, part) in &self.fields {
            out.put_slice(b"--");
            out.put_slice(self.boundary.as_bytes());
            out.put_slice(b"\r\n");
            out.put_slice(part.headers(name).as_bytes());
            out.put_slice(b"\r\n\r\n");
            out.put_slice(&part.data);
            out.put_slice(b"\r\n");
        }
        out.put_slice(b"--");
        out.put_slice(self.boundary.as_bytes());
        out.put_slice(b"--\r\n");

        out.freeze()
    }
}

/// One part of a multipart form.
#[derive(Debug, Clone)]
pub struct Part {
    data: Bytes,
    content_type: Option<String>,
    file_name: Option<String>,
}

impl Part {
    pub fn text<V: Into<String>>(value: V) -> Self {
        Self {
            data: Bytes::from(value.into()),
            content_type: None,
            file_name: None,
        }
    }

    pub fn bytes<B: Into<Bytes>>(data: B) -> Self {
        Self {
            data: data.into(),
            content_type: None,
            file_name: None,
        }
    }

    pub fn content_type<S: Into<String>>(mut self, mime: S) -> Self {
        self.content_type = Some(mime.into());
        self
    }

    pub fn file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.file_name = Some(name.into());
        self
    }

    fn headers(&self, name: &str) -> String {
        let mut header = format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_quotes(name)
        );
        if let Some(ref filename) = self.file_name {
            header.push_str(&format!("; filename=\"{}\"", escape_quotes(filename)));
        }
        if let Some(ref mime) = self.content_type {
            header.push_str(&format!("\r\nContent-Type: {}", mime));
        }
        header
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}

fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!("----urlconn-{:016x}{:08x}{:04x}", nanos, std::process::id(), seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_form() {
        let form = Form::new();
        assert_eq!(form.content_length(), 0);
        assert!(form.into_body().is_empty());
    }

    #[test]
    fn test_exact_framing() {
        let form = Form::with_boundary("XYZ")
            .text("a", "1")
            .part(
                "f",
                Part::bytes(&b"raw"[..])
                    .file_name("f.bin")
                    .content_type("application/octet-stream"),
            );

        let expected = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"f\"; filename=\"f.bin\"\r\n\
            Content-Type: application/octet-stream\r\n\r\nraw\r\n\
            --XYZ--\r\n";

        assert_eq!(form.content_length(), expected.len());
        assert_eq!(form.into_body(), Bytes::from(expected));
    }

    #[test]
    fn test_boundaries_are_unique() {
        assert_ne!(Form::new().boundary(), Form::new().boundary());
        assert!(Form::new().boundary().starts_with("----urlconn-"));
    }

    #[test]
    fn test_content_type() {
        let form = Form::with_boundary("b1");
        assert_eq!(form.content_type(), "multipart/form-data; boundary=b1");
    }

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape_quotes("normal"), "normal");
        assert_eq!(escape_quotes("with\"quote"), "with\\\"quote");
        assert_eq!(escape_quotes("with\\slash"), "with\\\\slash");
    }
}
