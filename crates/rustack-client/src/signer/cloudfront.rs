use rustack_client_auth::SignatureMethod;
use rustack_client_auth::path::{join_urn, with_query};
use rustack_client_auth::sigv2::sign;
use rustack_client_auth::sigv4::content_md5;
use rustack_client_core::{ConnectionDescriptor, RequestDescriptor};

use super::{RequestSigner, SignOutcome, SignerError, SigningContext, contentify_body};

const DEFAULT_CONTENT_TYPE: &str = "application/xml";
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// CloudFront `AWS <key>:<signature>` header signer.
///
/// The signature is the HMAC-SHA1 of the `date` header alone; the API version
/// is the first path segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudFrontSigner;

impl RequestSigner for CloudFrontSigner {
    fn sign(
        &self,
        ctx: &SigningContext<'_>,
        connection: &mut ConnectionDescriptor,
        request: &mut RequestDescriptor,
    ) -> Result<SignOutcome, SignerError> {
        if !request.body.is_blank() {
            contentify_body(request, DEFAULT_CONTENT_TYPE)?;
            if let Some(payload) = request.body.signable_bytes() {
                request.headers.insert("content-md5", content_md5(&payload));
            }
        }

        request
            .headers
            .set_if_blank("date", ctx.now.format(HTTP_DATE_FORMAT).to_string());
        let date = request.headers.first("date").unwrap_or_default().to_owned();
        let signature = sign(
            ctx.credentials.secret_key().expose(),
            &date,
            SignatureMethod::HmacSha1,
        );
        request.headers.insert(
            "authorization",
            format!("AWS {}:{signature}", ctx.credentials.access_key_id()),
        );

        let api_version = ctx.config.api_version.as_deref().unwrap_or_default();
        let path = join_urn(&[&connection.base_path, api_version, &request.relative_path]);
        request.path = with_query(&path, &request.params);

        Ok(SignOutcome::Signed)
    }
}

#[cfg(test)]
mod tests {
    use rustack_client_core::{Body, ClientConfig, Verb};
    use serde_json::json;

    use super::*;
    use crate::signer::test_support::{connection, context, credentials};

    #[test]
    fn test_should_sign_date_header() {
        let credentials = credentials();
        let config = ClientConfig::builder().api_version("2012-07-01").build();
        let ctx = context(&credentials, &config);
        let mut conn = connection("https://cloudfront.amazonaws.com");
        let mut request =
            RequestDescriptor::new(Verb::Get, "distribution").with_param("MaxItems", "10");

        CloudFrontSigner.sign(&ctx, &mut conn, &mut request).unwrap();

        assert_eq!(
            request.headers.first("date"),
            Some("Wed, 01 Jan 2014 00:00:00 GMT")
        );
        assert_eq!(
            request.headers.first("authorization"),
            Some("AWS aws_access_key:xUc2glxg80CskEwRI6LId/r6hh0=")
        );
        assert_eq!(request.path, "/2012-07-01/distribution?MaxItems=10");
        assert!(!request.headers.contains("content-md5"));
    }

    #[test]
    fn test_should_serialize_body_and_set_md5() {
        let credentials = credentials();
        let config = ClientConfig::builder().api_version("2012-07-01").build();
        let ctx = context(&credentials, &config);
        let mut conn = connection("https://cloudfront.amazonaws.com");
        let mut request = RequestDescriptor::new(Verb::Post, "distribution/E1/invalidation")
            .with_body(json!({"InvalidationBatch": {"Path": ["/a", "/b"], "CallerReference": "x"}}));

        CloudFrontSigner.sign(&ctx, &mut conn, &mut request).unwrap();

        assert_eq!(request.headers.first("content-type"), Some(DEFAULT_CONTENT_TYPE));
        let Body::Bytes(body) = &request.body else {
            panic!("expected serialized body");
        };
        assert_eq!(
            request.headers.first("content-md5"),
            Some(content_md5(body).as_str())
        );
        let body = String::from_utf8_lossy(body);
        assert!(body.contains("<Path>/a</Path><Path>/b</Path>"));
    }
}
