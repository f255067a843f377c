//! Signed AWS API calls with retry classification and response caching.
//!
//! An [`ApiClient`] turns a logical call into a signed request and decides,
//! per attempt, what to do with the outcome:
//!
//! - [`signer`] - per-service adapters that place signature material
//! - [`retry`] - ordered error patterns and the retry budget
//! - [`cache`] - which calls may be served from memory
//! - [`pipeline`] - the stage sequence for one call
//! - [`transport`] - the seam to whatever actually sends HTTP requests
//! - [`presets`] - ready-made error and cache patterns
//!
//! The client never opens connections itself; plug a [`Transport`] in with
//! [`ApiClient::with_transport`]. Presigned links need no transport at all.

pub mod cache;
pub mod client;
pub mod clock;
pub mod error;
pub mod pipeline;
pub mod presets;
pub mod response_error;
pub mod retry;
pub mod signer;
pub mod transport;

pub use cache::{CachePattern, CacheValidator};
pub use client::{ApiClient, ApiRequest};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ClientError, ClientResult};
pub use pipeline::CallOutput;
pub use response_error::ApiError;
pub use retry::{ErrorAction, ErrorClassifier, ErrorPattern, RetryPolicy};
pub use signer::{RequestSigner, SignOutcome, SignerError, SigningContext};
pub use transport::{Response, Transport, TransportError};
