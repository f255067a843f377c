use rustack_client_auth::path::{append_query, join_urn};
use rustack_client_auth::sign_v2;
use rustack_client_core::{ConnectionDescriptor, RequestDescriptor};

use super::{RequestSigner, SignOutcome, SignerError, SigningContext, default_version};

/// SigV2 signer for Marketplace Web Service.
///
/// MWS sections live under `<service path>/<version>`, e.g.
/// `/Orders/2013-09-01`.
#[derive(Debug, Clone, Default)]
pub struct MwsSigner {
    service_path: Option<String>,
}

impl MwsSigner {
    /// Signer for the endpoint root.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signer for one MWS section.
    #[must_use]
    pub fn with_service_path(service_path: impl Into<String>) -> Self {
        Self {
            service_path: Some(service_path.into()),
        }
    }
}

impl RequestSigner for MwsSigner {
    fn sign(
        &self,
        ctx: &SigningContext<'_>,
        connection: &mut ConnectionDescriptor,
        request: &mut RequestDescriptor,
    ) -> Result<SignOutcome, SignerError> {
        request.params.insert(
            "AWSAccessKeyId".to_owned(),
            ctx.credentials.access_key_id().to_owned(),
        );
        default_version(request, ctx.config);

        let section = match (&self.service_path, request.params.get("Version")) {
            (Some(service_path), Some(version)) => format!("{service_path}/{version}"),
            (Some(service_path), None) => service_path.clone(),
            (None, _) => String::new(),
        };
        let path = join_urn(&[&connection.base_path, &request.relative_path, &section]);

        let signed = sign_v2(
            ctx.credentials.secret_key().expose(),
            &mut request.params,
            request.verb,
            &connection.host,
            &path,
            ctx.now,
        );
        request.path = append_query(&path, &signed);
        Ok(SignOutcome::Signed)
    }
}
