use rustack_client_auth::path::join_urn;
use rustack_client_auth::sigv4::content_md5;
use rustack_client_auth::{Placement, sign_v4};
use rustack_client_core::{ConnectionDescriptor, RequestDescriptor};

use super::{RequestSigner, SignOutcome, SignerError, SigningContext, contentify_body};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    HostedZones,
    Domains,
}

/// SigV4 signer for Route53 hosted zones (REST/XML, versioned paths) and
/// Route53 Domains (JSON).
#[derive(Debug, Clone, Copy)]
pub struct Route53Signer {
    flavor: Flavor,
}

impl Route53Signer {
    /// Signer for the hosted-zone REST API.
    #[must_use]
    pub fn hosted_zones() -> Self {
        Self {
            flavor: Flavor::HostedZones,
        }
    }

    /// Signer for the domain registration API.
    #[must_use]
    pub fn domains() -> Self {
        Self {
            flavor: Flavor::Domains,
        }
    }

    fn default_content_type(self) -> &'static str {
        match self.flavor {
            Flavor::HostedZones => "application/xml",
            Flavor::Domains => "application/x-amz-json-1.1",
        }
    }
}

impl RequestSigner for Route53Signer {
    fn sign(
        &self,
        ctx: &SigningContext<'_>,
        connection: &mut ConnectionDescriptor,
        request: &mut RequestDescriptor,
    ) -> Result<SignOutcome, SignerError> {
        if !request.body.is_blank() {
            contentify_body(request, self.default_content_type())?;
            if let Some(payload) = request.body.signable_bytes() {
                request.headers.set_if_blank("content-md5", content_md5(&payload));
            }
        }

        request.path = match self.flavor {
            Flavor::HostedZones => {
                let api_version = ctx.config.api_version.as_deref().unwrap_or_default();
                join_urn(&[&connection.base_path, api_version, &request.relative_path])
            }
            Flavor::Domains => join_urn(&[&connection.base_path, &request.relative_path]),
        };

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
    fn test_should_sign_hosted_zone_requests() {
        let credentials = credentials();
        let config = ClientConfig::builder().api_version("2013-04-01").build();
        let ctx = context(&credentials, &config);
        let mut conn = connection("https://route53.amazonaws.com");
        let mut request = RequestDescriptor::new(Verb::Get, "hostedzone").with_param("maxitems", "5");

        Route53Signer::hosted_zones()
            .sign(&ctx, &mut conn, &mut request)
            .unwrap();

        assert_eq!(request.path, "/2013-04-01/hostedzone?maxitems=5");
        assert!(
            request
                .headers
                .first("authorization")
                .unwrap()
                .contains("/20140101/us-east-1/route53/aws4_request")
        );
    }

    #[test]
    fn test_should_serialize_domain_requests_as_json() {
        let credentials = credentials();
        let config = ClientConfig::builder().api_version("2014-05-15").build();
        let ctx = context(&credentials, &config);
        let mut conn = connection("https://route53domains.us-east-1.amazonaws.com");
        let mut request = RequestDescriptor::new(Verb::Post, "")
            .with_header("x-amz-target", "Route53Domains_v20140515.ListDomains")
            .with_body(json!({"MaxItems": 10}));

        Route53Signer::domains()
            .sign(&ctx, &mut conn, &mut request)
            .unwrap();

        assert_eq!(request.path, "/");
        assert_eq!(
            request.headers.first("content-type"),
            Some("application/x-amz-json-1.1")
        );
        assert!(request.headers.contains("content-md5"));
        assert!(
            request
                .headers
                .first("authorization")
                .unwrap()
                .contains("/us-east-1/route53domains/aws4_request")
        );
    }
}
