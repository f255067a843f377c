use rustack_client_auth::path::{append_query, join_urn};
use rustack_client_auth::sigv4::FORM_CONTENT_TYPE;
use rustack_client_auth::sign_v2;
use rustack_client_core::{Body, ConnectionDescriptor, RequestDescriptor, Verb};
use tracing::debug;

use super::{RequestSigner, SignOutcome, SignerError, SigningContext, default_version};

/// SigV2 signer for EC2-style query APIs.
///
/// GET requests carry the signed query in the path. A GET whose signed query
/// grows beyond `max_get_path_length` is switched to POST, where the signed
/// query becomes a form body.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuerySigner;

impl RequestSigner for QuerySigner {
    fn sign(
        &self,
        ctx: &SigningContext<'_>,
        connection: &mut ConnectionDescriptor,
        request: &mut RequestDescriptor,
    ) -> Result<SignOutcome, SignerError> {
        if !matches!(request.verb, Verb::Get | Verb::Post) {
            return Err(SignerError::UnsupportedVerb(request.verb));
        }

        request.params.insert(
            "AWSAccessKeyId".to_owned(),
            ctx.credentials.access_key_id().to_owned(),
        );
        default_version(request, ctx.config);

        let path = join_urn(&[&connection.base_path, &request.relative_path]);
        let secret = ctx.credentials.secret_key().expose();
        let mut signed = sign_v2(
            secret,
            &mut request.params,
            request.verb,
            &connection.host,
            &path,
            ctx.now,
        );

        if request.verb == Verb::Get && signed.len() > ctx.config.max_get_path_length {
            debug!(
                length = signed.len(),
                limit = ctx.config.max_get_path_length,
                "Signed query too long for GET, switching to POST"
            );
            request.verb = Verb::Post;
            signed = sign_v2(
                secret,
                &mut request.params,
                request.verb,
                &connection.host,
                &path,
                ctx.now,
            );
        }

        if request.verb == Verb::Get {
            request.path = append_query(&path, &signed);
        } else {
            request.path = path;
            request.headers.insert("content-type", FORM_CONTENT_TYPE);
            request.body = Body::from(signed);
        }

        Ok(SignOutcome::Signed)
    }
}

#[cfg(test)]
mod tests {
    use rustack_client_core::ClientConfig;

    use super::*;
    use crate::signer::test_support::{connection, context, credentials};

    fn request() -> RequestDescriptor {
        RequestDescriptor::new(Verb::Get, "").with_param("Action", "DescribeRegions")
    }

    #[test]
    fn test_should_sign_get_into_path() {
        let credentials = credentials();
        let config = ClientConfig::builder().api_version("2016-11-15").build();
        let ctx = context(&credentials, &config);
        let mut conn = connection("https://ec2.us-east-1.amazonaws.com");
        let mut request = request();

        let outcome = QuerySigner.sign(&ctx, &mut conn, &mut request).unwrap();

        assert_eq!(outcome, SignOutcome::Signed);
        assert!(request.path.starts_with("/?AWSAccessKeyId=aws_access_key&Action=DescribeRegions&"));
        assert!(request.path.contains("&SignatureMethod=HmacSHA256&SignatureVersion=2&"));
        assert!(request.path.contains("&Timestamp=2014-01-01T00%3A00%3A00.000Z&Version=2016-11-15"));
        assert!(request.path.contains("&Signature="));
        assert!(matches!(request.body, Body::Empty));
    }

    #[test]
    fn test_should_keep_caller_version() {
        let credentials = credentials();
        let config = ClientConfig::builder().api_version("2016-11-15").build();
        let ctx = context(&credentials, &config);
        let mut conn = connection("https://ec2.us-east-1.amazonaws.com");
        let mut request = request().with_param("Version", "2010-01-01");

        QuerySigner.sign(&ctx, &mut conn, &mut request).unwrap();
        assert!(request.path.contains("Version=2010-01-01"));
    }

    #[test]
    fn test_should_switch_long_get_to_post() {
        let credentials = credentials();
        let config = ClientConfig::builder().max_get_path_length(64).build();
        let ctx = context(&credentials, &config);
        let mut conn = connection("https://ec2.us-east-1.amazonaws.com/base");
        let mut request = request();

        QuerySigner.sign(&ctx, &mut conn, &mut request).unwrap();

        assert_eq!(request.verb, Verb::Post);
        assert_eq!(request.path, "/base");
        assert_eq!(request.headers.first("content-type"), Some(FORM_CONTENT_TYPE));
        let Body::Bytes(body) = &request.body else {
            panic!("expected a form body");
        };
        assert!(body.starts_with(b"AWSAccessKeyId=aws_access_key&Action=DescribeRegions&"));
    }

    #[test]
    fn test_should_reject_other_verbs() {
        let credentials = credentials();
        let config = ClientConfig::default();
        let ctx = context(&credentials, &config);
        let mut conn = connection("https://ec2.us-east-1.amazonaws.com");
        let mut request = RequestDescriptor::new(Verb::Delete, "");

        let result = QuerySigner.sign(&ctx, &mut conn, &mut request);
        assert!(matches!(result, Err(SignerError::UnsupportedVerb(Verb::Delete))));
    }
}
