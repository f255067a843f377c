//! Access credentials for signing requests.
//!
//! The secret half of a credential pair is wrapped so that it never shows up in
//! `Debug` output, log lines, or error text.

use std::fmt;

use crate::error::{CoreError, CoreResult};

/// An AWS secret access key.
///
/// `Debug` and `Display` are redacted; use [`SecretKey::expose`] at the single
/// point where the key is fed into an HMAC.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    /// Wrap a raw secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Borrow the raw secret for signing.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(****)")
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

/// An access key id and secret key pair, immutable for the lifetime of a client.
///
/// # Examples
///
/// ```
/// use rustack_client_core::Credentials;
///
/// let creds = Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY");
/// assert_eq!(creds.access_key_id(), "AKIDEXAMPLE");
/// assert!(!format!("{creds:?}").contains("wJalr"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    secret_key: SecretKey,
}

impl Credentials {
    /// Create credentials from an access key id and a secret key.
    pub fn new(access_key_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_key: SecretKey::new(secret_key),
        }
    }

    /// Load credentials from the environment.
    ///
    /// Reads `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`, falling back to
    /// `ACCESS_KEY` / `SECRET_KEY`.
    pub fn from_env() -> CoreResult<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .or_else(|_| std::env::var("ACCESS_KEY"))
            .map_err(|_| CoreError::Config("missing AWS_ACCESS_KEY_ID".to_owned()))?;
        let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .or_else(|_| std::env::var("SECRET_KEY"))
            .map_err(|_| CoreError::Config("missing AWS_SECRET_ACCESS_KEY".to_owned()))?;

        if access_key_id.is_empty() || secret_key.is_empty() {
            return Err(CoreError::Config("credentials must not be blank".to_owned()));
        }

        Ok(Self::new(access_key_id, secret_key))
    }

    /// The public access key id.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The secret key.
    #[must_use]
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_redact_secret_in_debug_output() {
        let creds = Credentials::new("AKID", "super-secret");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("AKID"));
        assert!(!rendered.contains("super-secret"));
        assert_eq!(creds.secret_key().to_string(), "****");
    }

    #[test]
    fn test_should_expose_secret_for_signing() {
        let creds = Credentials::new("AKID", "super-secret");
        assert_eq!(creds.secret_key().expose(), "super-secret");
    }
}
