//! Request path assembly.

use rustack_client_core::ParamMap;

use crate::canonical::canonical_query_string;

/// Join path tokens into an absolute path.
///
/// Blank tokens are skipped and exactly one `/` separates neighbours. A
/// trailing `/` on the last token is kept, so folder-style keys survive.
///
/// # Examples
///
/// ```
/// use rustack_client_auth::path::join_urn;
///
/// assert_eq!(join_urn(&["/", "2012-07-01", "distribution"]), "/2012-07-01/distribution");
/// assert_eq!(join_urn(&["/base/", "/bucket", "folder/"]), "/base/bucket/folder/");
/// assert_eq!(join_urn(&["", ""]), "/");
/// ```
#[must_use]
pub fn join_urn(tokens: &[&str]) -> String {
    let mut result = String::from("/");
    let mut trailing_slash = false;

    for token in tokens.iter().filter(|t| !t.trim_matches('/').is_empty()) {
        let trimmed = token.trim_matches('/');
        if !result.ends_with('/') {
            result.push('/');
        }
        result.push_str(trimmed);
        trailing_slash = token.ends_with('/');
    }

    if trailing_slash && !result.ends_with('/') {
        result.push('/');
    }
    result
}

/// Append `params` to `path` as a canonical (sorted, escaped) query string.
///
/// Nothing is appended when `params` is empty.
#[must_use]
pub fn with_query(path: &str, params: &ParamMap) -> String {
    append_query(path, &canonical_query_string(params))
}

/// Append an already encoded query string to `path`, using `?` or `&`
/// depending on whether `path` already has a query.
#[must_use]
pub fn append_query(path: &str, query: &str) -> String {
    if query.is_empty() {
        return path.to_owned();
    }
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_join_tokens_with_single_slashes() {
        assert_eq!(join_urn(&["/", "foo", "bar"]), "/foo/bar");
        assert_eq!(join_urn(&["/api/", "/v1/", "items"]), "/api/v1/items");
    }

    #[test]
    fn test_should_skip_blank_tokens() {
        assert_eq!(join_urn(&["", "obj"]), "/obj");
        assert_eq!(join_urn(&["/", "", "obj"]), "/obj");
    }

    #[test]
    fn test_should_keep_trailing_slash_of_last_token() {
        assert_eq!(join_urn(&["bucket", "folder/"]), "/bucket/folder/");
        assert_eq!(join_urn(&["bucket/", "key"]), "/bucket/key");
    }

    #[test]
    fn test_should_append_sorted_query() {
        let params = ParamMap::from([
            ("b".to_owned(), "2".to_owned()),
            ("a".to_owned(), "x y".to_owned()),
        ]);
        assert_eq!(with_query("/foo", &params), "/foo?a=x%20y&b=2");
        assert_eq!(with_query("/foo", &ParamMap::new()), "/foo");
    }

    #[test]
    fn test_should_extend_existing_query() {
        assert_eq!(append_query("/foo?a=1", "b=2"), "/foo?a=1&b=2");
        assert_eq!(append_query("/foo", ""), "/foo");
    }
}
