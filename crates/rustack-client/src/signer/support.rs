use rustack_client_auth::path::join_urn;
use rustack_client_auth::{Placement, sign_v4};
use rustack_client_core::{Body, ConnectionDescriptor, RequestDescriptor};

use super::{RequestSigner, SignOutcome, SignerError, SigningContext};

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "AWSSupport_";

/// SigV4 signer for the AWS Support JSON-RPC API.
///
/// The action travels in `x-amz-target` as
/// `AWSSupport_<api version without dashes>.<action>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SupportSigner;

impl RequestSigner for SupportSigner {
    fn sign(
        &self,
        ctx: &SigningContext<'_>,
        connection: &mut ConnectionDescriptor,
        request: &mut RequestDescriptor,
    ) -> Result<SignOutcome, SignerError> {
        let action = request
            .headers
            .first("x-amz-target")
            .filter(|target| !target.is_empty())
            .map(ToOwned::to_owned)
            .or_else(|| ctx.action.map(ToOwned::to_owned))
            .ok_or(SignerError::Precondition("Action must be set"))?;

        let target = if action.starts_with(TARGET_PREFIX) {
            action
        } else {
            let version = ctx
                .config
                .api_version
                .as_deref()
                .unwrap_or_default()
                .replace('-', "");
            format!("{TARGET_PREFIX}{version}.{action}")
        };
        request.headers.insert("x-amz-target", target);
        request.headers.insert("content-type", CONTENT_TYPE);

        if request.body.is_blank() {
            request.body = Body::from("{}");
        }
        request.body.contentify(CONTENT_TYPE)?;

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
    use serde_json::json;

    use super::*;
    use crate::signer::test_support::{connection, context, credentials};

    #[test]
    fn test_should_build_target_from_action() {
        let credentials = credentials();
        let config = ClientConfig::builder().api_version("2013-04-15").build();
        let mut ctx = context(&credentials, &config);
        ctx.action = Some("DescribeCases");
        let mut conn = connection("https://support.us-east-1.amazonaws.com");
        let mut request = RequestDescriptor::new(Verb::Post, "");

        SupportSigner.sign(&ctx, &mut conn, &mut request).unwrap();

        assert_eq!(
            request.headers.first("x-amz-target"),
            Some("AWSSupport_20130415.DescribeCases")
        );
        assert_eq!(request.headers.first("content-type"), Some(CONTENT_TYPE));
        assert!(matches!(&request.body, Body::Bytes(b) if b.as_ref() == b"{}"));
        assert_eq!(request.path, "/");
    }

    #[test]
    fn test_should_serialize_params_body_as_json() {
        let credentials = credentials();
        let config = ClientConfig::builder().api_version("2013-04-15").build();
        let ctx = context(&credentials, &config);
        let mut conn = connection("https://support.us-east-1.amazonaws.com");
        let mut request = RequestDescriptor::new(Verb::Post, "")
            .with_header("x-amz-target", "DescribeServices")
            .with_body(json!({"language": "en"}));

        SupportSigner.sign(&ctx, &mut conn, &mut request).unwrap();

        assert_eq!(
            request.headers.first("x-amz-target"),
            Some("AWSSupport_20130415.DescribeServices")
        );
        assert!(matches!(&request.body, Body::Bytes(b) if b.as_ref() == br#"{"language":"en"}"#));
    }

    #[test]
    fn test_should_require_an_action() {
        let credentials = credentials();
        let config = ClientConfig::default();
        let ctx = context(&credentials, &config);
        let mut conn = connection("https://support.us-east-1.amazonaws.com");
        let mut request = RequestDescriptor::new(Verb::Post, "");

        let result = SupportSigner.sign(&ctx, &mut conn, &mut request);
        assert!(matches!(result, Err(SignerError::Precondition(_))));
    }
}
