//! Error types for the client core.

/// Core error type for request modelling and configuration.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The endpoint URL could not be parsed into a connection descriptor.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The HTTP verb is not one of GET, PUT, POST, DELETE or HEAD.
    #[error("unsupported verb: {0}")]
    UnsupportedVerb(String),

    /// A structured body could not be serialized for its content type.
    #[error("cannot serialize body as {content_type}: {reason}")]
    Serialization {
        /// The content type that was requested.
        content_type: String,
        /// What went wrong.
        reason: String,
    },

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for client core operations.
pub type CoreResult<T> = Result<T, CoreError>;
