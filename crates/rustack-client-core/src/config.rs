//! Client configuration.
//!
//! Provides [`ClientConfig`], the static per-client settings shared by every
//! call: endpoint, API version, S3 addressing style, presign lifetimes and the
//! retry budget. Values can be loaded from environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Per-client configuration.
///
/// # Examples
///
/// ```
/// use rustack_client_core::ClientConfig;
///
/// let config = ClientConfig::default();
/// assert_eq!(config.max_get_path_length, 2000);
/// assert!(config.virtual_hosting);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Service endpoint URL (e.g. `"https://ec2.us-east-1.amazonaws.com"`).
    #[builder(default = String::from("https://s3.amazonaws.com"), setter(into))]
    pub endpoint: String,

    /// API version sent as `Version` (query APIs) or used in paths (CloudFront).
    #[builder(default, setter(strip_option, into))]
    pub api_version: Option<String>,

    /// Whether DNS-compatible buckets are promoted into the host name.
    #[builder(default = true)]
    pub virtual_hosting: bool,

    /// Longest signed GET query before a query API call is re-sent as POST.
    #[builder(default = 2000)]
    pub max_get_path_length: usize,

    /// Lifetime of SigV4 presigned links, in seconds (`X-Amz-Expires`).
    #[builder(default = 3600)]
    pub presign_expires_secs: u64,

    /// Lifetime of SigV2 query-string links, in seconds (`Expires`).
    #[builder(default = 3600)]
    pub link_expires_secs: u64,

    /// Maximum attempts for one call, including the first one.
    #[builder(default = 5)]
    pub max_attempts: u32,

    /// Total time budget for one call, in seconds.
    #[builder(default = 60)]
    pub retry_deadline_secs: u64,

    /// Base delay between attempts, in milliseconds; doubled per retry.
    #[builder(default = 200)]
    pub retry_backoff_ms: u64,

    /// Share of matching 4xx responses treated as a poisoned connection.
    #[builder(default = 0.10)]
    pub transient_4xx_probability: f64,

    /// Whether `Describe*`-style responses may be served from the cache.
    #[builder(default = false)]
    pub cache_enabled: bool,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"), setter(into))]
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from("https://s3.amazonaws.com"),
            api_version: None,
            virtual_hosting: true,
            max_get_path_length: 2000,
            presign_expires_secs: 3600,
            link_expires_secs: 3600,
            max_attempts: 5,
            retry_deadline_secs: 60,
            retry_backoff_ms: 200,
            transient_4xx_probability: 0.10,
            cache_enabled: false,
            log_level: String::from("info"),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `AWS_ENDPOINT_URL` | `https://s3.amazonaws.com` |
    /// | `AWS_API_VERSION` | unset |
    /// | `NO_DNS_BUCKETS` | `false` |
    /// | `MAX_GET_PATH_LENGTH` | `2000` |
    /// | `PRESIGN_EXPIRES` | `3600` |
    /// | `LINK_EXPIRES` | `3600` |
    /// | `MAX_ATTEMPTS` | `5` |
    /// | `RETRY_DEADLINE` | `60` |
    /// | `RETRY_BACKOFF_MS` | `200` |
    /// | `TRANSIENT_4XX_PROBABILITY` | `0.10` |
    /// | `CACHE_ENABLED` | `false` |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("AWS_ENDPOINT_URL") {
            config.endpoint = v;
        }
        if let Ok(v) = std::env::var("AWS_API_VERSION") {
            if !v.is_empty() {
                config.api_version = Some(v);
            }
        }
        if let Ok(v) = std::env::var("NO_DNS_BUCKETS") {
            config.virtual_hosting = !parse_bool(&v);
        }
        if let Some(n) = parse_env("MAX_GET_PATH_LENGTH") {
            config.max_get_path_length = n;
        }
        if let Some(n) = parse_env("PRESIGN_EXPIRES") {
            config.presign_expires_secs = n;
        }
        if let Some(n) = parse_env("LINK_EXPIRES") {
            config.link_expires_secs = n;
        }
        if let Some(n) = parse_env("MAX_ATTEMPTS") {
            config.max_attempts = n;
        }
        if let Some(n) = parse_env("RETRY_DEADLINE") {
            config.retry_deadline_secs = n;
        }
        if let Some(n) = parse_env("RETRY_BACKOFF_MS") {
            config.retry_backoff_ms = n;
        }
        if let Some(p) = parse_env::<f64>("TRANSIENT_4XX_PROBABILITY") {
            config.transient_4xx_probability = p.clamp(0.0, 1.0);
        }
        if let Ok(v) = std::env::var("CACHE_ENABLED") {
            config.cache_enabled = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// The retry deadline as a [`Duration`].
    #[must_use]
    pub fn retry_deadline(&self) -> Duration {
        Duration::from_secs(self.retry_deadline_secs)
    }

    /// The base retry backoff as a [`Duration`].
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
