//! Error types for request signing.
//!
//! Signing itself never fails on malformed input (a malformed request is
//! rejected by the server, not locally). The variants here are configuration
//! problems the caller has to fix; none of them is worth retrying.

/// Errors that can occur while signing a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No host rule yields a service name for this host.
    #[error("cannot determine service name for host {0}")]
    UnresolvableService(String),

    /// The host resolved to a service but not to a region.
    #[error("cannot determine region for host {0}")]
    UnresolvableRegion(String),
}
