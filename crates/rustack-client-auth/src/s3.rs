//! S3 bucket/object addressing.
//!
//! A bucket either travels in the host (virtual-hosted style,
//! `bucket.s3.amazonaws.com/key`) or as the first path segment (path style,
//! `s3.amazonaws.com/bucket/key`). Only DNS-compatible bucket names can be
//! promoted into the host.

use rustack_client_core::ParamMap;

use crate::canonical::amz_escape;
use crate::path::join_urn;

/// Minimum bucket name length for DNS-style addressing.
const MIN_DNS_BUCKET_LEN: usize = 3;

/// Maximum bucket name length for DNS-style addressing.
const MAX_DNS_BUCKET_LEN: usize = 63;

/// Query keys that select a sub-resource and therefore take part in signing.
pub const SUB_RESOURCES: &[&str] = &[
    "acl",
    "cors",
    "delete",
    "lifecycle",
    "location",
    "logging",
    "notification",
    "policy",
    "requestPayment",
    "tagging",
    "torrent",
    "uploads",
    "versionId",
    "versioning",
    "versions",
    "website",
];

/// Prefix of the response-header override parameters, also signed.
pub const RESPONSE_OVERRIDE_PREFIX: &str = "response-";

/// A bucket and an already escaped object path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    /// Bucket name.
    pub bucket: String,
    /// Object key, escaped segment by segment.
    pub object: String,
}

/// Whether `name` may be used as a DNS label sequence.
///
/// # Examples
///
/// ```
/// use rustack_client_auth::s3::is_dns_bucket;
///
/// assert!(!is_dns_bucket("my"));
/// assert!(!is_dns_bucket("my_bucket"));
/// assert!(is_dns_bucket("my-bucket"));
/// ```
#[must_use]
pub fn is_dns_bucket(name: &str) -> bool {
    if !(MIN_DNS_BUCKET_LEN..=MAX_DNS_BUCKET_LEN).contains(&name.len()) {
        return false;
    }
    name.split('.').all(is_dns_label)
}

/// `^[a-z0-9]([a-z0-9-]*[a-z0-9])?$`
fn is_dns_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    let edge_ok = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            edge_ok(first)
                && edge_ok(last)
                && bytes.iter().all(|b| edge_ok(b) || *b == b'-')
        }
        _ => false,
    }
}

/// Escape an object key one `/`-separated segment at a time.
///
/// The separators stay literal and a trailing `/` is kept, so folder keys
/// keep their shape.
///
/// # Examples
///
/// ```
/// use rustack_client_auth::s3::escape_object_path;
///
/// assert_eq!(escape_object_path("a b/c+d/"), "a%20b/c%2Bd/");
/// ```
#[must_use]
pub fn escape_object_path(raw: &str) -> String {
    raw.split('/').map(amz_escape).collect::<Vec<_>>().join("/")
}

/// Split a request into bucket and escaped object path.
///
/// When `bucket` is given the relative path is taken as the already escaped
/// object path. Otherwise the first segment of `relative_path` is the bucket.
///
/// # Examples
///
/// ```
/// use rustack_client_auth::s3::split_bucket_and_object;
///
/// let location = split_bucket_and_object(None, "my-test-bucket/foo/bar/банана.jpg");
/// assert_eq!(location.bucket, "my-test-bucket");
/// assert_eq!(location.object, "foo/bar/%D0%B1%D0%B0%D0%BD%D0%B0%D0%BD%D0%B0.jpg");
/// ```
#[must_use]
pub fn split_bucket_and_object(bucket: Option<&str>, relative_path: &str) -> S3Location {
    if let Some(bucket) = bucket {
        return S3Location {
            bucket: bucket.to_owned(),
            object: relative_path.to_owned(),
        };
    }

    let (bucket, object) = relative_path
        .split_once('/')
        .unwrap_or((relative_path, ""));
    S3Location {
        bucket: bucket.to_owned(),
        object: if object.is_empty() {
            String::new()
        } else {
            escape_object_path(object)
        },
    }
}

/// Whether `bucket` goes into the host for this client.
#[must_use]
pub fn promotes_bucket(bucket: &str, virtual_hosting: bool) -> bool {
    virtual_hosting && is_dns_bucket(bucket)
}

/// Host to send the request to.
///
/// DNS-compatible buckets are prepended to `host`, unless `host` already
/// starts with `bucket.` followed by at least three more labels (which happens
/// when a redirect already pointed us at the virtual host).
///
/// # Examples
///
/// ```
/// use rustack_client_auth::s3::compute_host;
///
/// let host = compute_host("foo-bar-bucket", "a.b.com", true);
/// assert_eq!(host, "foo-bar-bucket.a.b.com");
/// assert_eq!(compute_host("foo-bar-bucket", &host, true), host);
/// assert_eq!(compute_host("foo-bar_bucket", "a.b.com", true), "a.b.com");
/// ```
#[must_use]
pub fn compute_host(bucket: &str, host: &str, virtual_hosting: bool) -> String {
    if !promotes_bucket(bucket, virtual_hosting) || host_embeds_bucket(bucket, host) {
        return host.to_owned();
    }
    format!("{bucket}.{host}")
}

/// Whether `host` is `bucket.` followed by at least three more labels.
fn host_embeds_bucket(bucket: &str, host: &str) -> bool {
    let Some(rest) = host.strip_prefix(bucket).and_then(|r| r.strip_prefix('.')) else {
        return false;
    };
    let mut labels = rest.rsplitn(3, '.');
    let (Some(top), Some(second), Some(head)) = (labels.next(), labels.next(), labels.next())
    else {
        return false;
    };
    !top.is_empty() && !second.is_empty() && !head.is_empty()
}

/// Wire path for an object: `/object` when the bucket is in the host,
/// `/bucket/object` otherwise.
///
/// # Examples
///
/// ```
/// use rustack_client_auth::s3::compute_path;
///
/// assert_eq!(compute_path("foo-bar", "obj", true), "/obj");
/// assert_eq!(compute_path("foo_bar", "obj", true), "/foo_bar/obj");
/// assert_eq!(compute_path("foo-bar", "obj", false), "/foo-bar/obj");
/// ```
#[must_use]
pub fn compute_path(bucket: &str, object: &str, virtual_hosting: bool) -> String {
    if promotes_bucket(bucket, virtual_hosting) {
        join_urn(&[object])
    } else {
        join_urn(&[bucket, object])
    }
}

/// Wire path for a folder: always `/bucket/object/`.
#[must_use]
pub fn compute_folder_path(bucket: &str, object: &str) -> String {
    let path = join_urn(&[bucket, object]);
    if path.ends_with('/') {
        path
    } else {
        format!("{path}/")
    }
}

/// Whether a query key selects a sub-resource.
#[must_use]
pub fn is_sub_resource(key: &str) -> bool {
    SUB_RESOURCES.contains(&key) || key.starts_with(RESPONSE_OVERRIDE_PREFIX)
}

/// The SigV2 canonicalized resource: `/bucket/object` plus the sorted
/// sub-resource parameters (`?acl&versionId=3`).
///
/// # Examples
///
/// ```
/// use rustack_client_auth::s3::canonicalized_resource;
/// use rustack_client_core::ParamMap;
///
/// let params = ParamMap::from([
///     ("versionId".to_owned(), "3".to_owned()),
///     ("acl".to_owned(), String::new()),
///     ("Foo".to_owned(), "1".to_owned()),
/// ]);
/// assert_eq!(canonicalized_resource("b", "k", &params), "/b/k?acl&versionId=3");
/// ```
#[must_use]
pub fn canonicalized_resource(bucket: &str, object: &str, params: &ParamMap) -> String {
    let mut resource = format!("/{bucket}/{object}");

    let sub_resources: Vec<String> = params
        .iter()
        .filter(|(k, _)| is_sub_resource(k))
        .map(|(k, v)| {
            if v.is_empty() {
                k.clone()
            } else {
                format!("{k}={v}")
            }
        })
        .collect();

    if !sub_resources.is_empty() {
        resource.push('?');
        resource.push_str(&sub_resources.join("&"));
    }
    resource
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_classify_dns_buckets() {
        assert!(!is_dns_bucket("my"));
        assert!(!is_dns_bucket("my_bucket"));
        assert!(is_dns_bucket("my-bucket"));
        assert!(is_dns_bucket("my.dotted.bucket"));
        assert!(!is_dns_bucket("My-Bucket"));
        assert!(!is_dns_bucket("-bucket"));
        assert!(!is_dns_bucket("bucket-"));
        assert!(!is_dns_bucket("my..bucket"));
        assert!(!is_dns_bucket(&"a".repeat(64)));
        assert!(is_dns_bucket(&"a".repeat(63)));
    }

    #[test]
    fn test_should_split_bucket_from_path() {
        let location = split_bucket_and_object(None, "my-test-bucket/foo/bar/банана.jpg");
        assert_eq!(
            location,
            S3Location {
                bucket: "my-test-bucket".to_owned(),
                object: "foo/bar/%D0%B1%D0%B0%D0%BD%D0%B0%D0%BD%D0%B0.jpg".to_owned(),
            }
        );
    }

    #[test]
    fn test_should_keep_trailing_slash_of_folder_keys() {
        let location = split_bucket_and_object(None, "bucket/a folder/");
        assert_eq!(location.object, "a%20folder/");
    }

    #[test]
    fn test_should_handle_bucket_only_paths() {
        let location = split_bucket_and_object(None, "bucket");
        assert_eq!(location.bucket, "bucket");
        assert_eq!(location.object, "");
        assert_eq!(compute_path(&location.bucket, &location.object, false), "/bucket");
    }

    #[test]
    fn test_should_use_explicit_bucket_as_is() {
        let location = split_bucket_and_object(Some("b"), "already%20escaped");
        assert_eq!(location.bucket, "b");
        assert_eq!(location.object, "already%20escaped");
    }

    #[test]
    fn test_should_promote_dns_bucket_once() {
        let host = compute_host("kd", "s3.amazonaws.com", true);
        assert_eq!(host, "s3.amazonaws.com");

        let host = compute_host("kd-bucket", "s3.amazonaws.com", true);
        assert_eq!(host, "kd-bucket.s3.amazonaws.com");
        assert_eq!(compute_host("kd-bucket", &host, true), host);
    }

    #[test]
    fn test_should_detect_bucket_already_in_host() {
        assert!(host_embeds_bucket("kd-bucket", "kd-bucket.s3.amazonaws.com"));
        assert!(host_embeds_bucket("kd-bucket", "kd-bucket.s3.eu-west-1.amazonaws.com"));
        assert!(!host_embeds_bucket("kd-bucket", "kd-bucket.amazonaws.com"));
        assert!(!host_embeds_bucket("kd-bucket", "kd-bucketx.s3.amazonaws.com"));
        assert!(!host_embeds_bucket("kd-bucket", "s3.amazonaws.com"));
        assert!(!host_embeds_bucket("kd.bucket", "kd-bucket.s3.amazonaws.com"));
        assert!(!host_embeds_bucket("kd-bucket", "kd-bucket.s3..com"));
    }

    #[test]
    fn test_should_not_promote_without_virtual_hosting() {
        assert_eq!(compute_host("my-bucket", "s3.amazonaws.com", false), "s3.amazonaws.com");
        assert_eq!(compute_path("my-bucket", "obj", false), "/my-bucket/obj");
    }

    #[test]
    fn test_should_always_keep_bucket_in_folder_paths() {
        assert_eq!(compute_folder_path("my-bucket", "photos"), "/my-bucket/photos/");
        assert_eq!(compute_folder_path("my-bucket", "photos/"), "/my-bucket/photos/");
    }

    #[test]
    fn test_should_recognise_sub_resources() {
        assert!(is_sub_resource("acl"));
        assert!(is_sub_resource("versionId"));
        assert!(is_sub_resource("response-content-type"));
        assert!(!is_sub_resource("Foo"));
        assert!(!is_sub_resource("Expires"));
    }

    #[test]
    fn test_should_omit_query_for_plain_resources() {
        let params = ParamMap::from([("Foo".to_owned(), "1".to_owned())]);
        assert_eq!(canonicalized_resource("b", "k", &params), "/b/k");
    }
}
