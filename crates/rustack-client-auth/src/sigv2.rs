//! AWS Signature Version 2.
//!
//! Query APIs sign the sorted, escaped parameter list:
//!
//! ```text
//! StringToSign = HTTP-Verb + "\n" +
//!                lowercase(Host) + "\n" +
//!                Path + "\n" +
//!                CanonicalQueryString
//! ```
//!
//! S3's REST flavour signs a header digest instead:
//!
//! ```text
//! StringToSign = HTTP-Verb + "\n" +
//!                Content-MD5 + "\n" +
//!                Content-Type + "\n" +
//!                Date + "\n" +
//!                CanonicalizedAmzHeaders +
//!                CanonicalizedResource
//! ```
//!
//! In both cases `Signature = Base64(HMAC(SecretKey, StringToSign))`.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use rustack_client_core::{HttpHeaders, ParamMap, Verb};
use sha1::Sha1;
use sha2::Sha256;
use tracing::debug;

use crate::canonical::{amz_escape, canonical_query_string};

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// The digest behind a SigV2 signature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignatureMethod {
    /// `HmacSHA1`
    HmacSha1,
    /// `HmacSHA256`, the default.
    #[default]
    HmacSha256,
}

impl SignatureMethod {
    /// The value sent as the `SignatureMethod` parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HmacSha1 => "HmacSHA1",
            Self::HmacSha256 => "HmacSHA256",
        }
    }

    /// Pick the method a caller asked for; anything unrecognised falls back to
    /// the default.
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("HmacSHA1") => Self::HmacSha1,
            _ => Self::HmacSha256,
        }
    }
}

impl fmt::Display for SignatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base64 HMAC of `data` keyed with `secret_key`.
///
/// # Examples
///
/// ```
/// use rustack_client_auth::sigv2::{SignatureMethod, sign};
///
/// let sig = sign("my-secret-key", "something-that-needs-to-be-signed", SignatureMethod::HmacSha1);
/// assert_eq!(sig, "kdHo0Ks4KkypU1CkYZzAxFIIX+0=");
/// ```
#[must_use]
pub fn sign(secret_key: &str, data: &str, method: SignatureMethod) -> String {
    let raw = match method {
        SignatureMethod::HmacSha1 => {
            let mut mac = HmacSha1::new_from_slice(secret_key.as_bytes())
                .expect("HMAC can accept any key length");
            mac.update(data.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
        SignatureMethod::HmacSha256 => {
            let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
                .expect("HMAC can accept any key length");
            mac.update(data.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
    };
    BASE64.encode(raw)
}

/// ISO-8601 UTC timestamp with the millisecond field forced to `.000Z`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use rustack_client_auth::sigv2::utc_iso8601;
///
/// let t = Utc.with_ymd_and_hms(2014, 1, 1, 12, 30, 5).unwrap();
/// assert_eq!(utc_iso8601(t), "2014-01-01T12:30:05.000Z");
/// ```
#[must_use]
pub fn utc_iso8601(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S.000Z").to_string()
}

/// Sign a flat parameter set with SigV2 and return the signed query string.
///
/// `params` is updated in place: `Timestamp` is set (unless present, or unless
/// `Expires` is present), `SignatureVersion` becomes `2` and `SignatureMethod`
/// is normalised to the digest actually used. The result is the canonical query
/// string followed by `&Signature=<escaped signature>`.
#[must_use]
pub fn sign_v2(
    secret_key: &str,
    params: &mut ParamMap,
    verb: Verb,
    host: &str,
    path: &str,
    now: DateTime<Utc>,
) -> String {
    if !params.contains_key("Expires") {
        params
            .entry("Timestamp".to_owned())
            .or_insert_with(|| utc_iso8601(now));
    }
    params.insert("SignatureVersion".to_owned(), "2".to_owned());

    let method = SignatureMethod::from_param(params.get("SignatureMethod").map(String::as_str));
    params.insert("SignatureMethod".to_owned(), method.as_str().to_owned());

    let canonical = canonical_query_string(params);
    let string_to_sign = format!(
        "{}\n{}\n{path}\n{canonical}",
        verb.as_str(),
        host.to_ascii_lowercase()
    );

    debug!(string_to_sign = ?string_to_sign, method = %method, "Built SigV2 string to sign");

    let signature = sign(secret_key, &string_to_sign, method);
    format!("{canonical}&Signature={}", amz_escape(&signature))
}

/// Build the S3 REST SigV2 string to sign.
///
/// The date slot takes `x-amz-date`, then `date`, then `expires` (the latter is
/// what query-string authentication puts there).
#[must_use]
pub fn build_s3_string_to_sign(verb: Verb, headers: &HttpHeaders, resource: &str) -> String {
    let content_md5 = headers.joined("content-md5").unwrap_or_default();
    let content_type = headers.joined("content-type").unwrap_or_default();
    let date = headers
        .joined("x-amz-date")
        .or_else(|| headers.joined("date"))
        .or_else(|| headers.joined("expires"))
        .unwrap_or_default();

    let mut amz_headers = headers
        .iter()
        .filter(|(name, _)| name.starts_with("x-amz-"))
        .map(|(name, values)| format!("{name}:{}", values.join(",")))
        .collect::<Vec<_>>()
        .join("\n");
    if !amz_headers.is_empty() {
        amz_headers.push('\n');
    }

    format!(
        "{}\n{content_md5}\n{content_type}\n{date}\n{amz_headers}{resource}",
        verb.as_str()
    )
}

/// Sign an S3 REST request with SigV2 (HMAC-SHA1).
#[must_use]
pub fn sign_s3(secret_key: &str, verb: Verb, headers: &HttpHeaders, resource: &str) -> String {
    let string_to_sign = build_s3_string_to_sign(verb, headers, resource);
    debug!(string_to_sign = ?string_to_sign, "Built S3 SigV2 string to sign");
    sign(secret_key, &string_to_sign, SignatureMethod::HmacSha1)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_should_match_known_sha1_vector() {
        assert_eq!(
            sign(
                "my-secret-key",
                "something-that-needs-to-be-signed",
                SignatureMethod::HmacSha1
            ),
            "kdHo0Ks4KkypU1CkYZzAxFIIX+0="
        );
    }

    #[test]
    fn test_should_set_signing_params() {
        let mut params = ParamMap::from([("Action".to_owned(), "DescribeRegions".to_owned())]);
        let signed = sign_v2("secret", &mut params, Verb::Get, "EC2.amazonaws.com", "/", now());

        assert_eq!(params["Timestamp"], "2014-01-01T00:00:00.000Z");
        assert_eq!(params["SignatureVersion"], "2");
        assert_eq!(params["SignatureMethod"], "HmacSHA256");
        assert!(signed.starts_with(
            "Action=DescribeRegions&SignatureMethod=HmacSHA256&SignatureVersion=2&Timestamp=2014-01-01T00%3A00%3A00.000Z&Signature="
        ));
    }

    #[test]
    fn test_should_not_set_timestamp_when_expires_present() {
        let mut params = ParamMap::from([("Expires".to_owned(), "2014-01-02T00:00:00Z".to_owned())]);
        let _ = sign_v2("secret", &mut params, Verb::Get, "host", "/", now());
        assert!(!params.contains_key("Timestamp"));
    }

    #[test]
    fn test_should_keep_caller_timestamp() {
        let mut params = ParamMap::from([("Timestamp".to_owned(), "fixed".to_owned())]);
        let _ = sign_v2("secret", &mut params, Verb::Get, "host", "/", now());
        assert_eq!(params["Timestamp"], "fixed");
    }

    #[test]
    fn test_should_honor_requested_sha1_method() {
        let mut params = ParamMap::from([("SignatureMethod".to_owned(), "HmacSHA1".to_owned())]);
        let signed = sign_v2("secret", &mut params, Verb::Post, "host", "/", now());

        let canonical = canonical_query_string(&params);
        let expected = sign(
            "secret",
            &format!("POST\nhost\n/\n{canonical}"),
            SignatureMethod::HmacSha1,
        );
        assert_eq!(signed, format!("{canonical}&Signature={}", amz_escape(&expected)));
    }

    #[test]
    fn test_should_replace_unknown_signature_method() {
        let mut params = ParamMap::from([("SignatureMethod".to_owned(), "HmacMD5".to_owned())]);
        let _ = sign_v2("secret", &mut params, Verb::Get, "host", "/", now());
        assert_eq!(params["SignatureMethod"], "HmacSHA256");
    }

    #[test]
    fn test_should_be_deterministic_for_fixed_inputs() {
        let mut a = ParamMap::from([("A".to_owned(), "B".to_owned())]);
        let mut b = a.clone();
        assert_eq!(
            sign_v2("secret", &mut a, Verb::Get, "Host", "/p", now()),
            sign_v2("secret", &mut b, Verb::Get, "host", "/p", now())
        );
    }

    #[test]
    fn test_should_build_s3_string_to_sign() {
        let headers: HttpHeaders = [
            ("Content-MD5", "md5"),
            ("Content-Type", "text/plain"),
            ("Date", "Tue, 27 Mar 2007 19:36:42 +0000"),
            ("X-Amz-Meta-B", "2"),
            ("x-amz-meta-a", "1"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            build_s3_string_to_sign(Verb::Put, &headers, "/bucket/key"),
            "PUT\nmd5\ntext/plain\nTue, 27 Mar 2007 19:36:42 +0000\nx-amz-meta-a:1\nx-amz-meta-b:2\n/bucket/key"
        );
    }

    #[test]
    fn test_should_use_expires_as_date_for_query_auth() {
        let headers: HttpHeaders = [("expires", "1000000")].into_iter().collect();
        assert_eq!(
            build_s3_string_to_sign(Verb::Get, &headers, "/b/o"),
            "GET\n\n\n1000000\n/b/o"
        );
    }
}
