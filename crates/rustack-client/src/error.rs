//! Error types for API calls.

use rustack_client_auth::AuthError;
use rustack_client_core::CoreError;

use crate::response_error::ApiError;
use crate::signer::SignerError;
use crate::transport::TransportError;

/// Errors surfaced by [`ApiClient`](crate::ApiClient) calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Configuration error; fatal, never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// Request model error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Signing failed (e.g. the host does not resolve to a service/region).
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A signer rejected the request.
    #[error(transparent)]
    Signer(#[from] SignerError),

    /// The transport reported a connection-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service answered with an error status.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The classifier decided not to retry.
    #[error("aborted after {attempts} attempt(s): {last}")]
    Aborted {
        /// Attempts made.
        attempts: u32,
        /// The failure that ended the call.
        last: Box<ClientError>,
    },

    /// The attempt/deadline budget ran out while retrying.
    #[error("giving up after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// The failure of the last attempt.
        last: Box<ClientError>,
    },
}

impl ClientError {
    /// HTTP status of the underlying service error, if there is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => Some(err.status),
            Self::Aborted { last, .. } | Self::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// The service error behind this failure, if there is one.
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            Self::Aborted { last, .. } | Self::RetriesExhausted { last, .. } => last.api_error(),
            _ => None,
        }
    }
}

/// Convenience result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
