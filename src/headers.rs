//! Header name normalization.
//!
//! The `http` crate hands us lowercase header names. Before anything is shown
//! to a template the names are put in their usual display form
//! (`x-foo-bar` becomes `X-Foo-Bar`) and then run through a table of known
//! headers whose canonical spelling is not plain title case (`ETag`,
//! `WWW-Authenticate`, `X-Request-ID`, ...).

use std::collections::HashMap;

use axum::http::HeaderMap;
use indexmap::IndexMap;
use once_cell::sync::Lazy;

/// Ordered mapping of header name to value.
pub type HeaderSet = IndexMap<String, String>;

pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONTENT_TYPE: &str = "Content-Type";

const KNOWN_HEADERS: &[&str] = &[
    "A-IM",
    "Accept",
    "Accept-CH",
    "Accept-Charset",
    "Accept-Datetime",
    "Accept-Encoding",
    "Accept-Language",
    "Accept-Patch",
    "Accept-Ranges",
    "Access-Control-Allow-Credentials",
    "Access-Control-Allow-Headers",
    "Access-Control-Allow-Methods",
    "Access-Control-Allow-Origin",
    "Access-Control-Expose-Headers",
    "Access-Control-Max-Age",
    "Access-Control-Request-Headers",
    "Access-Control-Request-Method",
    "Age",
    "Allow",
    "Alt-Svc",
    "Authorization",
    "Cache-Control",
    "Connection",
    "Content-Disposition",
    "Content-Encoding",
    "Content-Language",
    "Content-Length",
    "Content-Location",
    "Content-MD5",
    "Content-Range",
    "Content-Security-Policy",
    "Content-Type",
    "Cookie",
    "DNT",
    "Date",
    "Delta-Base",
    "ETag",
    "Expect",
    "Expect-CT",
    "Expires",
    "Forwarded",
    "From",
    "Front-End-Https",
    "HTTP2-Settings",
    "Host",
    "IM",
    "If-Match",
    "If-Modified-Since",
    "If-None-Match",
    "If-Range",
    "If-Unmodified-Since",
    "Last-Modified",
    "Link",
    "Location",
    "Max-Forwards",
    "NEL",
    "Origin",
    "P3P",
    "Pragma",
    "Prefer",
    "Preference-Applied",
    "Proxy-Authenticate",
    "Proxy-Authorization",
    "Proxy-Connection",
    "Public-Key-Pins",
    "Range",
    "Referer",
    "Refresh",
    "Retry-After",
    "Save-Data",
    "Server",
    "Set-Cookie",
    "Status",
    "Strict-Transport-Security",
    "TE",
    "Timing-Allow-Origin",
    "Tk",
    "Trailer",
    "Transfer-Encoding",
    "Upgrade",
    "Upgrade-Insecure-Requests",
    "User-Agent",
    "Vary",
    "Via",
    "WWW-Authenticate",
    "Warning",
    "X-ATT-DeviceId",
    "X-Content-Duration",
    "X-Content-Security-Policy",
    "X-Content-Type-Options",
    "X-Correlation-ID",
    "X-Csrf-Token",
    "X-Forwarded-For",
    "X-Forwarded-Host",
    "X-Forwarded-Proto",
    "X-Frame-Options",
    "X-Http-Method-Override",
    "X-Powered-By",
    "X-Request-ID",
    "X-Requested-With",
    "X-UA-Compatible",
    "X-UIDH",
    "X-Wap-Profile",
    "X-WebKit-CSP",
    "X-XSS-Protection",
];

static CANONICAL: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    KNOWN_HEADERS
        .iter()
        .map(|name| (name.to_ascii_lowercase(), *name))
        .collect()
});

/// Canonical spelling of a well-known header, looked up case-insensitively.
pub fn canonical_name(name: &str) -> Option<&'static str> {
    CANONICAL.get(&name.to_ascii_lowercase()).copied()
}

/// Applies canonical casing to known header names, keeping the position each
/// key first appeared at. An empty `Content-Length` is dropped: some servers
/// report a missing length as `""` rather than omitting it.
pub fn normalize_headers<I, K, V>(headers: I) -> HeaderSet
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut set = HeaderSet::new();
    for (name, value) in headers {
        let name = name.as_ref();
        let key = match canonical_name(name) {
            Some(canonical) => canonical.to_owned(),
            None => name.to_owned(),
        };
        set.insert(key, value.into());
    }

    if set.get(CONTENT_LENGTH).is_some_and(|value| value.is_empty()) {
        set.shift_remove(CONTENT_LENGTH);
    }
    set
}

/// `x-foo-bar` -> `X-Foo-Bar`.
pub fn display_name(name: &str) -> String {
    name.split('-').map(capitalize).collect::<Vec<_>>().join("-")
}

/// Converts a CGI-style transport key to header form: `FOO_BAR` -> `Foo-Bar`.
pub fn meta_to_header(key: &str) -> String {
    key.split('_').map(capitalize).collect::<Vec<_>>().join("-")
}

/// Collects headers out of CGI-style transport metadata.
///
/// Only `HTTP_*` keys carry client headers; `CONTENT_TYPE` and
/// `CONTENT_LENGTH` are reported without the prefix. Everything else
/// (`REMOTE_ADDR`, `SERVER_NAME`, ...) is ignored.
pub fn collect_meta_headers<I, K, V>(meta: I) -> HeaderSet
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut headers = Vec::new();
    let mut content = Vec::new();
    for (key, value) in meta {
        let key = key.as_ref();
        if let Some(rest) = key.strip_prefix("HTTP_") {
            headers.push((meta_to_header(rest), value.into()));
        } else if key == "CONTENT_TYPE" {
            content.push((CONTENT_TYPE.to_owned(), value.into()));
        } else if key == "CONTENT_LENGTH" {
            content.push((CONTENT_LENGTH.to_owned(), value.into()));
        }
    }
    headers.extend(content);
    normalize_headers(headers)
}

/// Request headers in display form, normalized.
pub fn collect_request_headers(headers: &HeaderMap) -> HeaderSet {
    normalize_headers(joined(headers))
}

/// Response headers in display form. No canonical renaming is applied.
pub fn collect_response_headers(headers: &HeaderMap) -> HeaderSet {
    joined(headers).collect()
}

// one entry per name, repeated values joined
fn joined(headers: &HeaderMap) -> impl Iterator<Item = (String, String)> + '_ {
    headers.keys().map(move |name| {
        let value = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        (display_name(name.as_str()), value)
    })
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use proptest::prelude::*;

    fn pairs(set: &HeaderSet) -> Vec<(&str, &str)> {
        set.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    #[test]
    fn test_known_headers_get_canonical_casing() {
        let set = normalize_headers([
            ("Etag", "\"abc\""),
            ("Www-Authenticate", "Basic"),
            ("X-Request-Id", "42"),
            ("dnt", "1"),
        ]);
        assert_eq!(
            pairs(&set),
            vec![
                ("ETag", "\"abc\""),
                ("WWW-Authenticate", "Basic"),
                ("X-Request-ID", "42"),
                ("DNT", "1"),
            ]
        );
    }

    #[test]
    fn test_unknown_headers_pass_through() {
        let set = normalize_headers([("X-Custom-thing", "a"), ("foo", "b")]);
        assert_eq!(pairs(&set), vec![("X-Custom-thing", "a"), ("foo", "b")]);
    }

    #[test]
    fn test_duplicate_spellings_keep_first_position() {
        let set = normalize_headers([("etag", "1"), ("Accept", "*/*"), ("ETAG", "2")]);
        assert_eq!(pairs(&set), vec![("ETag", "2"), ("Accept", "*/*")]);
    }

    #[test]
    fn test_empty_content_length_is_dropped() {
        let set = normalize_headers([("Content-Length", ""), ("Cookie", "")]);
        assert_eq!(pairs(&set), vec![("Cookie", "")]);

        let set = normalize_headers([("content-length", "12")]);
        assert_eq!(pairs(&set), vec![("Content-Length", "12")]);
    }

    #[test]
    fn test_meta_to_header() {
        assert_eq!(meta_to_header("FOO_BAR"), "Foo-Bar");
        assert_eq!(meta_to_header("_"), "-");
    }

    #[test]
    fn test_collect_meta_headers() {
        let set = collect_meta_headers([
            ("CONTENT_LENGTH", "17"),
            ("CONTENT_TYPE", "text/plain"),
            ("HTTP_COOKIE", ""),
            ("HTTP_FOO_BAR", "foo-bar"),
            ("HTTP_HTTP2_SETTINGS", "foobar"),
            ("REMOTE_ADDR", "127.0.0.1"),
        ]);
        assert_eq!(
            pairs(&set),
            vec![
                ("Cookie", ""),
                ("Foo-Bar", "foo-bar"),
                ("HTTP2-Settings", "foobar"),
                ("Content-Length", "17"),
                ("Content-Type", "text/plain"),
            ]
        );
    }

    #[test]
    fn test_collect_meta_headers_drops_empty_content_length() {
        let set = collect_meta_headers([("CONTENT_LENGTH", ""), ("HTTP_COOKIE", "")]);
        assert_eq!(pairs(&set), vec![("Cookie", "")]);
    }

    #[test]
    fn test_request_headers_from_header_map() {
        let mut map = HeaderMap::new();
        map.insert("content-type", HeaderValue::from_static("application/json"));
        map.insert("x-request-id", HeaderValue::from_static("abc"));
        map.append("accept", HeaderValue::from_static("text/html"));
        map.append("accept", HeaderValue::from_static("*/*"));

        let set = collect_request_headers(&map);
        assert_eq!(set.get("Content-Type").map(String::as_str), Some("application/json"));
        assert_eq!(set.get("X-Request-ID").map(String::as_str), Some("abc"));
        assert_eq!(set.get("Accept").map(String::as_str), Some("text/html, */*"));
    }

    #[test]
    fn test_response_headers_are_not_renamed() {
        let mut map = HeaderMap::new();
        map.insert("etag", HeaderValue::from_static("\"v1\""));
        map.insert("content-length", HeaderValue::from_static(""));

        let set = collect_response_headers(&map);
        assert_eq!(pairs(&set), vec![("Etag", "\"v1\""), ("Content-Length", "")]);
    }

    proptest! {
        #[test]
        fn normalizing_is_idempotent(
            headers in proptest::collection::vec(("[A-Za-z][A-Za-z0-9-]{0,20}", "[ -~]{0,12}"), 0..12)
        ) {
            let once = normalize_headers(headers);
            let twice = normalize_headers(once.clone());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn content_length_survives_unless_empty(value in "[0-9]{0,6}") {
            let set = normalize_headers([("content-length", value.clone())]);
            if value.is_empty() {
                prop_assert!(!set.contains_key(CONTENT_LENGTH));
            } else {
                prop_assert_eq!(set.get(CONTENT_LENGTH), Some(&value));
            }
        }
    }
}
