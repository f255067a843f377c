//! AWS Signature Version 4 signing.
//!
//! [`sign_v4`] signs a [`RequestDescriptor`] in place:
//!
//! 1. Resolve `{service, region}` from the host and build the credential scope.
//! 2. Place auth material: content headers plus `x-amz-date` for
//!    [`Placement::Headers`], or `X-Amz-*` query parameters for
//!    [`Placement::QueryParams`] (presigned links).
//! 3. Build the canonical request and the string to sign.
//! 4. Derive the signing key with the HMAC-SHA256 chain and sign.
//! 5. Rewrite the path with the final query string, then attach the signature
//!    as an `Authorization` header or an `X-Amz-Signature` parameter.
//!
//! The signing key is re-derived on every call; it is never cached.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use md5::Md5;
use rustack_client_core::{Body, Credentials, RequestDescriptor};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::canonical::{build_canonical_headers, build_canonical_request, canonical_query_string};
use crate::error::AuthError;
use crate::path::append_query;
use crate::region::{ServiceScope, resolve_service_and_region};

/// The only algorithm this engine produces.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Payload hash sentinel for bodies that are not hashed.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Default lifetime of a signature, in seconds.
pub const DEFAULT_EXPIRES_SECS: u64 = 3600;

/// Content type assumed for bodies that carry none.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

type HmacSha256 = Hmac<Sha256>;

/// Where the signature material goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// `Authorization` header plus content and date headers.
    Headers,
    /// `X-Amz-*` query parameters; the body and content headers are untouched.
    QueryParams,
}

/// The `date/region/service/aws4_request` scope a signature is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialScope {
    /// `YYYYMMDD`.
    pub date: String,
    /// Region name.
    pub region: String,
    /// Service name.
    pub service: String,
}

impl CredentialScope {
    /// Scope for `now` and a resolved service/region.
    #[must_use]
    pub fn new(now: DateTime<Utc>, scope: ServiceScope) -> Self {
        Self {
            date: now.format("%Y%m%d").to_string(),
            region: scope.region,
            service: scope.service,
        }
    }
}

impl fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/aws4_request",
            self.date, self.region, self.service
        )
    }
}

/// Build the SigV4 string to sign.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256\n
/// <ISO8601 timestamp>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
///
/// # Examples
///
/// ```
/// use rustack_client_auth::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key using HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, b"aws4_request")
}

/// Compute the HMAC-SHA256 signature of `data` using the given `signing_key`.
///
/// Returns the hex-encoded signature.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Lowercase hex SHA-256 of a payload.
///
/// # Examples
///
/// ```
/// use rustack_client_auth::sigv4::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Base64 MD5 of a payload, the `Content-MD5` header format.
#[must_use]
pub fn content_md5(payload: &[u8]) -> String {
    BASE64.encode(Md5::digest(payload))
}

/// Sign `request` with SigV4, mutating it in place.
///
/// `request.path` must hold the wire path without a query string; on return it
/// carries the canonical query string (and, for [`Placement::QueryParams`], the
/// trailing `X-Amz-Signature`). The host is lower-cased and written into the
/// `host` header, and every header present is signed.
///
/// # Errors
///
/// Returns an [`AuthError`] if no service/region can be derived from `host`.
pub fn sign_v4(
    credentials: &Credentials,
    host: &str,
    request: &mut RequestDescriptor,
    placement: Placement,
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    let host = host.to_ascii_lowercase();
    let scope = CredentialScope::new(now, resolve_service_and_region(&host)?);
    let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
    let credential_scope = scope.to_string();

    if request.path.is_empty() {
        request.path = "/".to_owned();
    }
    let canonical_uri = request.path.clone();

    request.headers.remove("authorization");
    let mut payload_hash = UNSIGNED_PAYLOAD.to_owned();
    if placement == Placement::Headers {
        payload_hash = place_header_material(request, &timestamp);
    }

    request.headers.insert("host", host.as_str());
    let (canonical_headers, signed_headers) = build_canonical_headers(&request.headers);

    if placement == Placement::QueryParams {
        place_query_material(request, &timestamp, &signed_headers, credentials, &credential_scope);
    }

    let canonical_query = canonical_query_string(&request.params);
    let canonical_request = build_canonical_request(
        request.verb.as_str(),
        &canonical_uri,
        &canonical_query,
        &canonical_headers,
        &signed_headers,
        &payload_hash,
    );

    debug!(canonical_request = ?canonical_request, "Built SigV4 canonical request");

    let string_to_sign = build_string_to_sign(
        &timestamp,
        &credential_scope,
        &hash_payload(canonical_request.as_bytes()),
    );

    debug!(string_to_sign = ?string_to_sign, "Built SigV4 string to sign");

    let signing_key = derive_signing_key(
        credentials.secret_key().expose(),
        &scope.date,
        &scope.region,
        &scope.service,
    );
    let signature = compute_signature(&signing_key, &string_to_sign);

    request.path = append_query(&request.path, &canonical_query);

    match placement {
        Placement::Headers => {
            request.headers.insert(
                "authorization",
                format!(
                    "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
                    credentials.access_key_id()
                ),
            );
        }
        Placement::QueryParams => {
            request.path = append_query(&request.path, &format!("X-Amz-Signature={signature}"));
        }
    }

    debug!(
        host = %host,
        service = %scope.service,
        region = %scope.region,
        placement = ?placement,
        "Signed request with SigV4"
    );

    Ok(())
}

/// Set content, payload-hash and date headers. Returns the payload hash.
fn place_header_material(request: &mut RequestDescriptor, timestamp: &str) -> String {
    let expires = request
        .headers
        .first("x-amz-expires")
        .map_or_else(|| DEFAULT_EXPIRES_SECS.to_string(), ToOwned::to_owned);

    let payload_hash = match request.body.signable_bytes() {
        None => {
            request
                .headers
                .set_if_blank("x-amz-content-sha256", UNSIGNED_PAYLOAD);
            UNSIGNED_PAYLOAD.to_owned()
        }
        Some(payload) => {
            let payload_hash = hash_payload(&payload);
            request
                .headers
                .set_if_blank("content-length", payload.len().to_string());
            request
                .headers
                .set_if_blank("content-type", FORM_CONTENT_TYPE);
            request
                .headers
                .set_if_blank("content-md5", content_md5(&payload));
            request
                .headers
                .set_if_blank("x-amz-content-sha256", payload_hash.as_str());
            request.body = bytes_body(payload);
            payload_hash
        }
    };

    request.headers.insert("x-amz-date", timestamp);
    request.headers.insert("x-amz-expires", expires);
    payload_hash
}

/// Inject the `X-Amz-*` presign parameters.
fn place_query_material(
    request: &mut RequestDescriptor,
    timestamp: &str,
    signed_headers: &str,
    credentials: &Credentials,
    credential_scope: &str,
) {
    let params = &mut request.params;
    params
        .entry("X-Amz-Expires".to_owned())
        .or_insert_with(|| DEFAULT_EXPIRES_SECS.to_string());
    params.insert("X-Amz-Date".to_owned(), timestamp.to_owned());
    params.insert("X-Amz-Algorithm".to_owned(), ALGORITHM.to_owned());
    params.insert("X-Amz-SignedHeaders".to_owned(), signed_headers.to_owned());
    params.insert(
        "X-Amz-Credential".to_owned(),
        format!("{}/{credential_scope}", credentials.access_key_id()),
    );
}

fn bytes_body(payload: Bytes) -> Body {
    if payload.is_empty() {
        Body::Empty
    } else {
        Body::Bytes(payload)
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
