//! Request payloads: raw bytes tagged with a MIME classification and an
//! optional filename used for multipart framing.

use crate::http::multipart::Part;
use bytes::Bytes;
use std::io;
use std::path::Path;

/// Closed MIME classification for payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MimeType {
    /// Falls back to generic binary.
    #[default]
    Unknown,
    ApplicationJson,
    ImageJpeg,
}

impl MimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MimeType::Unknown => "application/octet-stream",
            MimeType::ApplicationJson => "application/json",
            MimeType::ImageJpeg => "image/jpeg",
        }
    }

    /// Guess from a file extension; anything unrecognised is `Unknown`.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "json" => MimeType::ApplicationJson,
            "jpg" | "jpeg" => MimeType::ImageJpeg,
            _ => MimeType::Unknown,
        }
    }
}

impl std::fmt::Display for MimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An opaque body part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    data: Bytes,
    mime_type: MimeType,
    file_name: Option<String>,
}

impl Payload {
    pub fn new<B: Into<Bytes>>(data: B, mime_type: MimeType) -> Self {
        Self {
            data: data.into(),
            mime_type,
            file_name: None,
        }
    }

    /// Set the filename used when the payload is framed as a multipart part.
    pub fn file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Read a file into a payload. The MIME type is guessed from the
    /// extension of `path`.
    pub fn from_path<P: AsRef<Path>>(path: P, file_name: Option<String>) -> io::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(MimeType::from_extension)
            .unwrap_or_default();

        Ok(Self {
            data: Bytes::from(data),
            mime_type,
            file_name,
        })
    }

    /// Serialize `value` as a JSON payload.
    #[cfg(feature = "json")]
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let data = serde_json::to_vec(value)?;
        Ok(Self::new(data, MimeType::ApplicationJson))
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn mime_type(&self) -> MimeType {
        self.mime_type
    }

    pub fn content_type(&self) -> &'static str {
        self.mime_type.as_str()
    }

    pub fn get_file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Payload> for Part {
    fn from(payload: Payload) -> Self {
        let part = Part::bytes(payload.data).content_type(payload.mime_type.as_str());
        match payload.file_name {
            Some(name) => part.file_name(name),
            None => part,
        }
    }
}
