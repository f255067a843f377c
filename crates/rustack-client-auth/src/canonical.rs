//! Canonicalization helpers shared by both signature versions.
//!
//! AWS escapes everything except the RFC 3986 unreserved characters
//! (`A-Z a-z 0-9 - _ . ~`); a space becomes `%20`, never `+`. Query strings are
//! sorted by key in byte order before escaping, so the server can rebuild the
//! exact same string.
//!
//! The SigV4 canonical request is:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use rustack_client_core::{HttpHeaders, ParamMap};

/// Characters that must be percent-encoded: everything but the unreserved set.
pub const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a string with AWS's escaping rules.
///
/// # Examples
///
/// ```
/// use rustack_client_auth::canonical::amz_escape;
///
/// assert_eq!(amz_escape("a b/c~d"), "a%20b%2Fc~d");
/// assert_eq!(amz_escape("банана"), "%D0%B1%D0%B0%D0%BD%D0%B0%D0%BD%D0%B0");
/// ```
#[must_use]
pub fn amz_escape(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

/// Build the canonical query string: sorted `key=value` pairs, both escaped,
/// joined with `&`.
///
/// # Examples
///
/// ```
/// use rustack_client_auth::canonical::canonical_query_string;
/// use rustack_client_core::ParamMap;
///
/// let params = ParamMap::from([
///     ("b".to_owned(), "2 3".to_owned()),
///     ("a".to_owned(), "1".to_owned()),
/// ]);
/// assert_eq!(canonical_query_string(&params), "a=1&b=2%203");
/// ```
#[must_use]
pub fn canonical_query_string(params: &ParamMap) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", amz_escape(k), amz_escape(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical URI by re-encoding each path segment.
///
/// Forward slashes are preserved and empty paths become `/`. Segments are
/// decoded first so an already-escaped object key is not escaped twice.
///
/// # Examples
///
/// ```
/// use rustack_client_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri("/test.txt"), "/test.txt");
/// assert_eq!(build_canonical_uri(""), "/");
/// assert_eq!(build_canonical_uri("/a%20b"), "/a%20b");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            amz_escape(&decoded)
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Canonical header lines and the signed-headers list for every header in
/// `headers`.
///
/// Returns `(canonical_headers, signed_headers)`: sorted `name:value` lines
/// joined by `\n` (multi-valued headers joined with `,`, whitespace collapsed),
/// and the sorted names joined by `;`.
///
/// # Examples
///
/// ```
/// use rustack_client_auth::canonical::build_canonical_headers;
/// use rustack_client_core::HttpHeaders;
///
/// let headers: HttpHeaders = [("foo", "x"), ("bar", "y"), ("bar", "z")].into_iter().collect();
/// let (canonical, signed) = build_canonical_headers(&headers);
/// assert_eq!(canonical, "bar:y,z\nfoo:x");
/// assert_eq!(signed, "bar;foo");
/// ```
#[must_use]
pub fn build_canonical_headers(headers: &HttpHeaders) -> (String, String) {
    let mut lines = Vec::with_capacity(headers.len());
    let mut names = Vec::with_capacity(headers.len());

    for (name, values) in headers.iter() {
        let value = values
            .iter()
            .map(|v| collapse_whitespace(v.trim()))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(format!("{name}:{value}"));
        names.push(name);
    }

    (lines.join("\n"), names.join(";"))
}

/// Assemble the SigV4 canonical request from already canonical parts.
#[must_use]
pub fn build_canonical_request(
    method: &str,
    canonical_uri: &str,
    canonical_query: &str,
    canonical_headers: &str,
    signed_headers: &str,
    payload_hash: &str,
) -> String {
    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers}\n{payload_hash}"
    )
}

/// Collapse consecutive whitespace characters in a string to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
