//! Per-service request signers.
//!
//! Every AWS API family places its signature material somewhere else: the
//! query string, a form body, the `Authorization` header or presigned query
//! parameters. A [`RequestSigner`] makes those decisions for one family and
//! delegates the cryptography to [`rustack_client_auth`].
//!
//! Signers run once per attempt on a fresh copy of the request, so the wire
//! path is always rebuilt from `relative_path` and never signed twice.

mod cloudfront;
mod mws;
mod query;
mod query_v4;
mod route53;
mod s3;
mod s3_link;
mod support;

use std::fmt;

use chrono::{DateTime, Utc};
use rustack_client_auth::AuthError;
use rustack_client_core::{
    ClientConfig, ConnectionDescriptor, CoreError, Credentials, RequestDescriptor, Verb,
};

pub use cloudfront::CloudFrontSigner;
pub use mws::MwsSigner;
pub use query::QuerySigner;
pub use query_v4::QueryV4Signer;
pub use route53::Route53Signer;
pub use s3::S3Signer;
pub use s3_link::{S3LinkSigner, S3QueryLinkSigner};
pub use support::SupportSigner;

/// Errors raised while signing.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// Signature computation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The body could not be serialized.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The signer cannot carry this verb.
    #[error("unsupported verb for this API: {0}")]
    UnsupportedVerb(Verb),

    /// The request does not meet the signer's requirements.
    #[error("{0}")]
    Precondition(&'static str),
}

/// Call-scoped inputs a signer reads.
#[derive(Debug, Clone, Copy)]
pub struct SigningContext<'a> {
    /// Client credentials.
    pub credentials: &'a Credentials,
    /// Client configuration.
    pub config: &'a ClientConfig,
    /// Time of this attempt.
    pub now: DateTime<Utc>,
    /// Logical action name, when the call has one.
    pub action: Option<&'a str>,
}

/// What the pipeline does after signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutcome {
    /// The request is ready to be sent.
    Signed,
    /// Nothing to send; the call's result is this URL.
    Done(String),
}

/// Places signature material for one API family.
pub trait RequestSigner: Send + Sync + fmt::Debug {
    /// Sign `request` in place. The signer may point `connection` at another
    /// host (e.g. a bucket virtual host).
    fn sign(
        &self,
        ctx: &SigningContext<'_>,
        connection: &mut ConnectionDescriptor,
        request: &mut RequestDescriptor,
    ) -> Result<SignOutcome, SignerError>;
}

/// Serialize a structured body for the request's content type, defaulting the
/// content type first.
fn contentify_body(
    request: &mut RequestDescriptor,
    default_content_type: &str,
) -> Result<(), SignerError> {
    request
        .headers
        .set_if_blank("content-type", default_content_type);
    let content_type = request
        .headers
        .first("content-type")
        .unwrap_or(default_content_type)
        .to_owned();
    request.body.contentify(&content_type)?;
    Ok(())
}

/// Set `Version` from the configured API version unless the caller set one.
fn default_version(request: &mut RequestDescriptor, config: &ClientConfig) {
    if let Some(version) = &config.api_version {
        request
            .params
            .entry("Version".to_owned())
            .or_insert_with(|| version.clone());
    }
}
