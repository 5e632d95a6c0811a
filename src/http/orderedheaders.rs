use crate::base::error::StartError;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use std::str::FromStr;

/// A header map that preserves insertion order.
///
/// Later inserts of an existing name replace the value in place, so caller
/// headers override defaults without moving them.
#[derive(Debug, Clone, Default)]
pub struct OrderedHeaderMap {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl OrderedHeaderMap {
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    pub fn insert(&mut self, name: &str, value: &str) -> Result<(), StartError> {
        let name_header =
            HeaderName::from_str(name).map_err(|_| StartError::InvalidHeader(name.to_string()))?;
        let value_header =
            HeaderValue::from_str(value).map_err(|_| StartError::InvalidHeader(name.to_string()))?;

        if let Some((_, v)) = self.headers.iter_mut().find(|(n, _)| *n == name_header) {
            *v = value_header;
        } else {
            self.headers.push((name_header, value_header));
        }
        Ok(())
    }

    /// Insert only when no header of that name exists yet.
    pub fn insert_default(&mut self, name: &str, value: &str) -> Result<(), StartError> {
        if self.get(name).is_some() {
            return Ok(());
        }
        self.insert(name, value)
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        let target = HeaderName::from_str(name).ok()?;
        self.headers
            .iter()
            .find(|(n, _)| *n == target)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.headers.iter().map(|(n, v)| (n, v))
    }

    /// Convert into an `http::HeaderMap`, keeping order.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            map.append(name.clone(), value.clone());
        }
        map
    }
}
