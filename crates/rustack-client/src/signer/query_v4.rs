use rustack_client_auth::path::join_urn;
use rustack_client_auth::{Placement, sign_v4};
use rustack_client_core::{ConnectionDescriptor, RequestDescriptor};

use super::{RequestSigner, SignOutcome, SignerError, SigningContext, default_version};

/// SigV4 signer for query APIs that moved to header signing (SQS and friends).
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryV4Signer;

impl RequestSigner for QueryV4Signer {
    fn sign(
        &self,
        ctx: &SigningContext<'_>,
        connection: &mut ConnectionDescriptor,
        request: &mut RequestDescriptor,
    ) -> Result<SignOutcome, SignerError> {
        default_version(request, ctx.config);
        request.path = join_urn(&[&connection.base_path, &request.relative_path]);
        sign_v4(
            ctx.credentials,
            &connection.host,
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

    use super::*;
    use crate::signer::test_support::{connection, context, credentials};

    #[test]
    fn test_should_sign_queue_request_with_sigv4_headers() {
        let credentials = credentials();
        let config = ClientConfig::builder().api_version("2012-11-05").build();
        let ctx = context(&credentials, &config);
        let mut conn = connection("https://sqs.us-east-1.amazonaws.com");
        let mut request =
            RequestDescriptor::new(Verb::Get, "123456789012/queue").with_param("Action", "GetQueueUrl");

        QueryV4Signer.sign(&ctx, &mut conn, &mut request).unwrap();

        assert_eq!(
            request.path,
            "/123456789012/queue?Action=GetQueueUrl&Version=2012-11-05"
        );
        let auth = request.headers.first("authorization").unwrap();
        assert!(auth.contains("Credential=aws_access_key/20140101/us-east-1/sqs/aws4_request"));
        assert_eq!(request.headers.first("host"), Some("sqs.us-east-1.amazonaws.com"));
    }

    #[test]
    fn test_should_fail_on_unresolvable_host() {
        let credentials = credentials();
        let config = ClientConfig::default();
        let ctx = context(&credentials, &config);
        let mut conn = connection("http://localhost");
        let mut request = RequestDescriptor::new(Verb::Get, "");

        let result = QueryV4Signer.sign(&ctx, &mut conn, &mut request);
        assert!(matches!(result, Err(SignerError::Auth(_))));
    }
}
