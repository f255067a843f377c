use rustack_client_auth::s3::{
    compute_folder_path, compute_host, compute_path, split_bucket_and_object,
};
use rustack_client_auth::{Placement, sign_v4};
use rustack_client_core::{Body, ConnectionDescriptor, RequestDescriptor};

use super::{RequestSigner, SignOutcome, SignerError, SigningContext, contentify_body};

const DEFAULT_CONTENT_TYPE: &str = "binary/octet-stream";
const TREE_CONTENT_TYPE: &str = "application/xml";

/// SigV4 signer for the S3 REST API.
///
/// DNS-compatible buckets move into the host when virtual hosting is on;
/// otherwise the bucket stays the first path segment. In folder mode the
/// bucket always stays in the path and the path ends with `/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3Signer {
    folder: bool,
}

impl S3Signer {
    /// Signer for bucket and object requests.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signer for folder-style keys.
    #[must_use]
    pub fn folder() -> Self {
        Self { folder: true }
    }
}

impl RequestSigner for S3Signer {
    fn sign(
        &self,
        ctx: &SigningContext<'_>,
        connection: &mut ConnectionDescriptor,
        request: &mut RequestDescriptor,
    ) -> Result<SignOutcome, SignerError> {
        let location = split_bucket_and_object(request.bucket.as_deref(), &request.relative_path);

        if matches!(request.body, Body::Tree(_)) {
            contentify_body(request, TREE_CONTENT_TYPE)?;
        }
        request
            .headers
            .set_if_blank("content-type", DEFAULT_CONTENT_TYPE);

        let virtual_hosting = ctx.config.virtual_hosting && !self.folder;
        let host = compute_host(&location.bucket, &connection.host, virtual_hosting);
        if host != connection.host {
            *connection = connection.with_host(host.as_str());
        }

        request.path = if self.folder {
            compute_folder_path(&location.bucket, &location.object)
        } else {
            compute_path(&location.bucket, &location.object, virtual_hosting)
        };

        sign_v4(
            ctx.credentials,
            &host,
            request,
            Placement::Headers,
            ctx.now,
        )?;
        Ok(SignOutcome::Signed)
    }
}

#[cfg(test)]
mod tests {
    use rustack_client_core::{ClientConfig, Verb};
    use serde_json::json;

    use super::*;
    use crate::signer::test_support::{connection, context, credentials};

    #[test]
    fn test_should_promote_dns_bucket_into_host() {
        let credentials = credentials();
        let config = ClientConfig::default();
        let ctx = context(&credentials, &config);
        let mut conn = connection("https://s3.amazonaws.com");
        let mut request = RequestDescriptor::new(Verb::Get, "my-bucket/foo/bar baz.txt");

        S3Signer::new().sign(&ctx, &mut conn, &mut request).unwrap();

        assert_eq!(conn.host, "my-bucket.s3.amazonaws.com");
        assert_eq!(request.path, "/foo/bar%20baz.txt");
        assert_eq!(request.headers.first("host"), Some("my-bucket.s3.amazonaws.com"));
        assert_eq!(request.headers.first("content-type"), Some(DEFAULT_CONTENT_TYPE));
        assert!(
            request
                .headers
                .first("authorization")
                .unwrap()
                .contains("/20140101/us-east-1/s3/aws4_request")
        );
    }

    #[test]
    fn test_should_keep_non_dns_bucket_in_path() {
        let credentials = credentials();
        let config = ClientConfig::default();
        let ctx = context(&credentials, &config);
        let mut conn = connection("https://s3.amazonaws.com");
        let mut request = RequestDescriptor::new(Verb::Get, "my_bucket/key");

        S3Signer::new().sign(&ctx, &mut conn, &mut request).unwrap();

        assert_eq!(conn.host, "s3.amazonaws.com");
        assert_eq!(request.path, "/my_bucket/key");
    }

    #[test]
    fn test_should_not_promote_twice() {
        let credentials = credentials();
        let config = ClientConfig::default();
        let ctx = context(&credentials, &config);
        let mut conn = connection("https://s3.amazonaws.com");

        for _ in 0..2 {
            let mut request = RequestDescriptor::new(Verb::Get, "my-bucket/key");
            S3Signer::new().sign(&ctx, &mut conn, &mut request).unwrap();
        }
        assert_eq!(conn.host, "my-bucket.s3.amazonaws.com");
    }

    #[test]
    fn test_should_use_path_style_when_virtual_hosting_is_off() {
        let credentials = credentials();
        let config = ClientConfig::builder().virtual_hosting(false).build();
        let ctx = context(&credentials, &config);
        let mut conn = connection("https://s3.amazonaws.com");
        let mut request = RequestDescriptor::new(Verb::Get, "").with_bucket("my-bucket");

        S3Signer::new().sign(&ctx, &mut conn, &mut request).unwrap();

        assert_eq!(conn.host, "s3.amazonaws.com");
        assert_eq!(request.path, "/my-bucket");
    }

    #[test]
    fn test_should_keep_folder_paths_with_trailing_slash() {
        let credentials = credentials();
        let config = ClientConfig::default();
        let ctx = context(&credentials, &config);
        let mut conn = connection("https://s3.amazonaws.com");
        let mut request = RequestDescriptor::new(Verb::Put, "my-bucket/photos/2014");

        S3Signer::folder().sign(&ctx, &mut conn, &mut request).unwrap();

        assert_eq!(conn.host, "s3.amazonaws.com");
        assert_eq!(request.path, "/my-bucket/photos/2014/");
    }

    #[test]
    fn test_should_serialize_tree_bodies_as_xml() {
        let credentials = credentials();
        let config = ClientConfig::default();
        let ctx = context(&credentials, &config);
        let mut conn = connection("https://s3.amazonaws.com");
        let mut request = RequestDescriptor::new(Verb::Put, "my-bucket")
            .with_param("versioning", "")
            .with_body(json!({"VersioningConfiguration": {"Status": "Enabled"}}));

        S3Signer::new().sign(&ctx, &mut conn, &mut request).unwrap();

        assert_eq!(request.headers.first("content-type"), Some(TREE_CONTENT_TYPE));
        let Body::Bytes(body) = &request.body else {
            panic!("expected serialized body");
        };
        let body = String::from_utf8_lossy(body);
        assert!(body.contains("<Status>Enabled</Status>"));
        assert_eq!(request.path, "/?versioning=");
    }
}
