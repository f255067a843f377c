//! The transport seam.
//!
//! The client never opens connections itself. A [`Transport`] receives the fully
//! signed request and reports either a [`Response`] (any HTTP status) or a
//! [`TransportError`] for failures below HTTP, so the classifier can tell a
//! poisoned connection from an error status.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use rustack_client_core::{ConnectionDescriptor, HttpHeaders, RequestDescriptor};

/// An HTTP response as seen by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Status code.
    pub status: u16,
    /// Response headers.
    pub headers: HttpHeaders,
    /// Response body.
    pub body: Bytes,
}

impl Response {
    /// Create a response from a status and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HttpHeaders::new(),
            body: body.into(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Whether the status is 2xx or 3xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }

    /// The body as text, lossily decoded.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Failures below the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established or broke mid-request.
    #[error("connection failed: {0}")]
    Connection(String),

    /// No response arrived in time.
    #[error("request timed out: {0}")]
    Timeout(String),
}

impl TransportError {
    /// Whether this is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Sends signed requests.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Send one signed request.
    async fn send(
        &self,
        connection: &ConnectionDescriptor,
        request: &RequestDescriptor,
    ) -> Result<Response, TransportError>;

    /// Tear down any pooled connection to `connection` so it is not reused.
    async fn disconnect(&self, connection: &ConnectionDescriptor);
}
