//! Typed helpers for parse steps: JSON with an expected root shape, UTF-8
//! text, and a printable rendering of arbitrary bytes for logs.

use crate::base::error::ConnectionError;
use serde_json::{Map, Value};

/// Decode a JSON body whose root must be an object.
///
/// A well-formed body with any other root yields the connection-domain
/// `JsonResultType` error; malformed JSON yields a `Json`-domain error.
pub fn json_dictionary(body: &[u8]) -> Result<Map<String, Value>, ConnectionError> {
    match serde_json::from_slice::<Value>(body)? {
        Value::Object(map) => Ok(map),
        _ => Err(ConnectionError::json_result_type("object")),
    }
}

/// Decode a JSON body whose root must be an array.
pub fn json_array(body: &[u8]) -> Result<Vec<Value>, ConnectionError> {
    match serde_json::from_slice::<Value>(body)? {
        Value::Array(items) => Ok(items),
        _ => Err(ConnectionError::json_result_type("array")),
    }
}

/// Decode a JSON body straight into `T`.
pub fn decode_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ConnectionError> {
    Ok(serde_json::from_slice(body)?)
}

/// Strict UTF-8 conversion; `None` on invalid input.
pub fn string_from_utf8(body: &[u8]) -> Option<String> {
    std::str::from_utf8(body).ok().map(str::to_owned)
}

/// Render bytes for logging: valid UTF-8 runs are kept, control characters
/// become mnemonics (`\n`, `\t`, `\0`, ...), invalid bytes become `\xNN`.
pub fn debug_string(body: &[u8]) -> String {
    let mut out = String::with_capacity(body.len());
    for chunk in body.utf8_chunks() {
        for c in chunk.valid().chars() {
            match c {
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\0' => out.push_str("\\0"),
                c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
                c => out.push(c),
            }
        }
        for byte in chunk.invalid() {
            out.push_str(&format!("\\x{:02x}", byte));
        }
    }
    out
}
