//! Core request model, configuration, and parameter flattening for the Rustack
//! AWS client.
//!
//! This crate holds the plain data that flows through a signed API call:
//! the [`RequestDescriptor`] that signers mutate, the [`ConnectionDescriptor`]
//! a signer may rewrite (e.g. when a bucket is promoted into the host), the
//! client-wide [`ClientConfig`] and [`Credentials`], and the
//! [`params::flatten`] transform every query API needs before signing.

pub mod config;
pub mod content;
pub mod credentials;
pub mod error;
pub mod headers;
pub mod params;
pub mod request;
pub mod types;

pub use config::ClientConfig;
pub use credentials::Credentials;
pub use error::{CoreError, CoreResult};
pub use headers::HttpHeaders;
pub use params::{ParamMap, flatten};
pub use request::{Body, ConnectionDescriptor, PayloadStream, RequestDescriptor};
pub use types::Verb;
