//! AWS request signing for the Rustack AWS client.
//!
//! This crate turns a [`RequestDescriptor`](rustack_client_core::RequestDescriptor)
//! into a signed wire request. It provides both signature versions used by the
//! AWS APIs the client talks to:
//!
//! - [`sigv2`] - query-string signing (EC2-style query APIs, MWS) and the S3
//!   REST header digest
//! - [`sigv4`] - header or presigned query-parameter signing
//!
//! plus the pieces they share: AWS escaping and canonical forms
//! ([`canonical`]), host to service/region resolution ([`region`]), path
//! joining ([`path`]) and S3 bucket/object addressing ([`s3`]).
//!
//! All functions are stateless; digests are created per call.

pub mod canonical;
pub mod error;
pub mod path;
pub mod region;
pub mod s3;
pub mod sigv2;
pub mod sigv4;

pub use canonical::amz_escape;
pub use error::AuthError;
pub use region::{ServiceScope, resolve_service_and_region};
pub use sigv2::{SignatureMethod, sign_v2};
pub use sigv4::{CredentialScope, Placement, sign_v4};
