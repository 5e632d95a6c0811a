//! Percent-encoding for query strings and form bodies.
//!
//! One rule is used everywhere: RFC 3986 unreserved characters
//! (`A-Z a-z 0-9 - . _ ~`) pass through, every other byte of the UTF-8
//! encoding is written as `%XX`. A space is always `%20`, never `+`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

/// Everything except RFC 3986 unreserved characters.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a single key or value.
pub fn url_encode(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Build `k1=v1&k2=v2` from pairs, encoding both sides.
///
/// Pairs are emitted in iteration order; callers holding a `BTreeMap`
/// get keys in sorted order.
pub fn query_string<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = String::new();
    for (key, value) in pairs {
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(&url_encode(key));
        out.push('=');
        out.push_str(&url_encode(value));
    }
    out
}

/// Append an already-encoded query to `url`, joining with `&` when the URL
/// carries a query of its own.
pub fn append_query(url: &mut Url, query: &str) {
    if query.is_empty() {
        return;
    }
    let combined = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{}&{}", existing, query),
        _ => query.to_string(),
    };
    url.set_query(Some(&combined));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_space_is_percent_20() {
        assert_eq!(url_encode("a b"), "a%20b");
    }

    #[test]
    fn test_unreserved_pass_through() {
        assert_eq!(url_encode("AZaz09-._~"), "AZaz09-._~");
    }

    #[test]
    fn test_reserved_are_escaped() {
        assert_eq!(url_encode("a&b=c+d/e?"), "a%26b%3Dc%2Bd%2Fe%3F");
    }

    #[test]
    fn test_utf8_bytes() {
        assert_eq!(url_encode("caf\u{e9}"), "caf%C3%A9");
    }

    #[test]
    fn test_query_string_sorted_map() {
        let mut params = BTreeMap::new();
        params.insert("q".to_string(), "a b".to_string());
        params.insert("n".to_string(), "1".to_string());

        let query = query_string(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        assert_eq!(query, "n=1&q=a%20b");
    }

    #[test]
    fn test_query_string_empty() {
        assert_eq!(query_string(std::iter::empty()), "");
    }

    #[test]
    fn test_append_query() {
        let mut url = Url::parse("http://example.com/search").unwrap();
        append_query(&mut url, "q=a%20b");
        assert_eq!(url.as_str(), "http://example.com/search?q=a%20b");

        let mut url = Url::parse("http://example.com/search?lang=en").unwrap();
        append_query(&mut url, "q=x");
        assert_eq!(url.as_str(), "http://example.com/search?lang=en&q=x");
    }

    #[test]
    fn test_append_empty_query_is_noop() {
        let mut url = Url::parse("http://example.com/").unwrap();
        append_query(&mut url, "");
        assert_eq!(url.query(), None);
    }
}
