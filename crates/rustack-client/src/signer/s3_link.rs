use rustack_client_auth::path::with_query;
use rustack_client_auth::s3::{
    S3Location, canonicalized_resource, compute_host, compute_path, split_bucket_and_object,
};
use rustack_client_auth::sigv2::sign_s3;
use rustack_client_auth::{Placement, sign_v4};
use rustack_client_core::{ConnectionDescriptor, HttpHeaders, RequestDescriptor, Verb};
use tracing::debug;

use super::{RequestSigner, SignOutcome, SignerError, SigningContext};

/// SigV4 presigned S3 link.
///
/// Only a bare GET can be presigned: the link carries its signature and
/// expiry (`X-Amz-Expires`, `presign_expires_secs` unless given) in the query
/// string and the call finishes with the URL instead of a network round trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3LinkSigner;

impl RequestSigner for S3LinkSigner {
    fn sign(
        &self,
        ctx: &SigningContext<'_>,
        connection: &mut ConnectionDescriptor,
        request: &mut RequestDescriptor,
    ) -> Result<SignOutcome, SignerError> {
        check_link_request(request)?;
        if !request.headers.is_empty() {
            return Err(SignerError::Precondition("Headers must be blank"));
        }

        let location = split_bucket_and_object(request.bucket.as_deref(), &request.relative_path);
        let host = address(ctx, connection, request, &location);

        request
            .params
            .entry("X-Amz-Expires".to_owned())
            .or_insert_with(|| ctx.config.presign_expires_secs.to_string());
        sign_v4(
            ctx.credentials,
            &host,
            request,
            Placement::QueryParams,
            ctx.now,
        )?;

        Ok(SignOutcome::Done(connection.url_for(&request.path)))
    }
}

/// SigV2 query-string S3 link (`AWSAccessKeyId`, `Expires`, `Signature`).
#[derive(Debug, Clone, Copy, Default)]
pub struct S3QueryLinkSigner;

impl RequestSigner for S3QueryLinkSigner {
    fn sign(
        &self,
        ctx: &SigningContext<'_>,
        connection: &mut ConnectionDescriptor,
        request: &mut RequestDescriptor,
    ) -> Result<SignOutcome, SignerError> {
        check_link_request(request)?;

        let location = split_bucket_and_object(request.bucket.as_deref(), &request.relative_path);

        request.params.insert(
            "AWSAccessKeyId".to_owned(),
            ctx.credentials.access_key_id().to_owned(),
        );
        let expires = request
            .params
            .entry("Expires".to_owned())
            .or_insert_with(|| link_expiry(ctx).to_string())
            .clone();

        let mut headers = HttpHeaders::new();
        headers.insert("expires", expires);
        let resource = canonicalized_resource(&location.bucket, &location.object, &request.params);
        let signature = sign_s3(
            ctx.credentials.secret_key().expose(),
            Verb::Get,
            &headers,
            &resource,
        );
        request.params.insert("Signature".to_owned(), signature);

        let host = address(ctx, connection, request, &location);
        request.path = with_query(&request.path, &request.params);
        debug!(host = %host, resource = %resource, "Built S3 query-string link");

        Ok(SignOutcome::Done(connection.url_for(&request.path)))
    }
}

fn check_link_request(request: &RequestDescriptor) -> Result<(), SignerError> {
    if request.verb != Verb::Get {
        return Err(SignerError::Precondition("Only GET method is supported"));
    }
    if !request.body.is_blank() {
        return Err(SignerError::Precondition("Body must be blank"));
    }
    Ok(())
}

/// Point the connection at the bucket host and set the bare wire path.
fn address(
    ctx: &SigningContext<'_>,
    connection: &mut ConnectionDescriptor,
    request: &mut RequestDescriptor,
    location: &S3Location,
) -> String {
    let virtual_hosting = ctx.config.virtual_hosting;
    let host = compute_host(&location.bucket, &connection.host, virtual_hosting);
    if host != connection.host {
        *connection = connection.with_host(host.as_str());
    }
    request.path = compute_path(&location.bucket, &location.object, virtual_hosting);
    host
}

fn link_expiry(ctx: &SigningContext<'_>) -> i64 {
    let lifetime = i64::try_from(ctx.config.link_expires_secs).unwrap_or(i64::MAX);
    ctx.now.timestamp().saturating_add(lifetime)
}
