//! Request configuration and its translation into a wire request.

use crate::base::error::StartError;
use crate::http::encoding::{append_query, query_string};
use crate::http::method::RequestMethod;
use crate::http::multipart::Form;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::payload::Payload;
use crate::http::requestbody::RequestBody;
use std::collections::BTreeMap;
use url::Url;

/// Everything the caller configures about a request before `start()`.
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    pub url: String,
    pub method: RequestMethod,
    /// Custom headers, applied in order after the context defaults.
    pub headers: Vec<(String, String)>,
    /// Query parameters for GET, form fields for POST. Sorted by key.
    pub parameters: BTreeMap<String, String>,
    /// File parts; when non-empty a POST body is sent as multipart.
    pub file_parts: Vec<(String, Payload)>,
    /// Raw body; takes precedence over parameters and file parts.
    pub payload: Option<Payload>,
    /// Run under the background guard. `None` uses the context default.
    pub run_in_background: Option<bool>,
}

impl RequestConfig {
    pub fn new<U: Into<String>>(method: RequestMethod, url: U) -> Self {
        Self {
            url: url.into(),
            method,
            ..Default::default()
        }
    }

    fn parameter_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The fully encoded request handed to a transport.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: RequestMethod,
    pub url: Url,
    pub headers: OrderedHeaderMap,
    pub body: RequestBody,
}

impl WireRequest {
    /// Encode `config`. `defaults` are applied first so caller headers win.
    pub fn build(config: &RequestConfig, defaults: &[(String, String)]) -> Result<Self, StartError> {
        let mut url = parse_target(&config.url)?;

        let mut headers = OrderedHeaderMap::new();
        for (name, value) in defaults {
            headers.insert(name, value)?;
        }
        for (name, value) in &config.headers {
            headers.insert(name, value)?;
        }

        let body = match config.method {
            RequestMethod::Get => {
                append_query(&mut url, &query_string(config.parameter_pairs()));
                RequestBody::Empty
            }
            RequestMethod::Post => post_body(config),
        };

        if let Some(content_type) = body.content_type() {
            headers.insert_default("Content-Type", content_type)?;
        }

        Ok(Self {
            method: config.method,
            url,
            headers,
            body,
        })
    }

    /// Origin-form target (`/path?query`) for HTTP/1.1 request lines.
    pub fn path_and_query(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }
}

fn post_body(config: &RequestConfig) -> RequestBody {
    if let Some(payload) = &config.payload {
        return RequestBody::new(payload.data().clone(), payload.content_type());
    }

    if !config.file_parts.is_empty() {
        let mut form = Form::new();
        for (name, value) in config.parameter_pairs() {
            form = form.text(name, value);
        }
        for (name, payload) in &config.file_parts {
            form = form.part(name.clone(), payload.clone().into());
        }
        let content_type = form.content_type();
        return RequestBody::new(form.into_body(), content_type);
    }

    RequestBody::form(query_string(config.parameter_pairs()))
}

/// Validate a target address: non-empty, absolute, http(s) with a host.
pub fn parse_target(raw: &str) -> Result<Url, StartError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(StartError::MissingUrl);
    }

    let url = Url::parse(raw).map_err(|e| StartError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(StartError::UnsupportedScheme(other.to_string())),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(StartError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}
