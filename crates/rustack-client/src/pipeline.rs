//! One logical API call, end to end.
//!
//! The stages run in a fixed order over a [`Pipeline`] that borrows the
//! client's collaborators:
//!
//! 1. cache lookup (skipped when no cache is configured)
//! 2. per attempt: copy the request template, read the clock, sign
//! 3. stop with a link if the signer finished the call
//! 4. send through the transport
//! 5. on success store in the cache and return; on failure classify and
//!    either retry with a fresh signature or surface the error
//!
//! All per-call state lives on the stack of [`Pipeline::run`], so concurrent
//! calls never share a request or connection descriptor.

use rustack_client_auth::path::with_query;
use rustack_client_core::{ClientConfig, ConnectionDescriptor, Credentials, RequestDescriptor};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::CacheValidator;
use crate::clock::Clock;
use crate::error::{ClientError, ClientResult};
use crate::response_error::ApiError;
use crate::retry::{AttemptFailure, ErrorAction, ErrorClassifier, RetryPolicy};
use crate::signer::{RequestSigner, SignOutcome, SignerError, SigningContext};
use crate::transport::{Response, Transport};

/// Result of a successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutput {
    /// A response, either fresh from the network or served from the cache.
    Response {
        /// The response.
        response: Response,
        /// Whether it came from the cache.
        from_cache: bool,
    },
    /// A presigned URL; no request was sent.
    Link(String),
}

impl CallOutput {
    /// The response, if the call produced one.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Response { response, .. } => Some(response),
            Self::Link(_) => None,
        }
    }

    /// The link, if the call produced one.
    #[must_use]
    pub fn link(&self) -> Option<&str> {
        match self {
            Self::Link(url) => Some(url),
            Self::Response { .. } => None,
        }
    }

    /// Whether the response was served from the cache.
    #[must_use]
    pub fn from_cache(&self) -> bool {
        matches!(self, Self::Response { from_cache: true, .. })
    }
}

/// Borrowed collaborators for one call.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    /// Client credentials.
    pub credentials: &'a Credentials,
    /// Client configuration.
    pub config: &'a ClientConfig,
    /// Signer for the API family.
    pub signer: &'a dyn RequestSigner,
    /// Transport; required unless the signer finishes calls itself.
    pub transport: Option<&'a dyn Transport>,
    /// Error classification.
    pub classifier: &'a ErrorClassifier,
    /// Response cache.
    pub cache: Option<&'a CacheValidator>,
    /// Time source for signatures.
    pub clock: &'a dyn Clock,
    /// Attempt and deadline budget.
    pub policy: RetryPolicy,
}

impl Pipeline<'_> {
    /// Run one call for `template`.
    pub async fn run(
        &self,
        template: &RequestDescriptor,
        action: Option<&str>,
    ) -> ClientResult<CallOutput> {
        let endpoint = ConnectionDescriptor::parse(&self.config.endpoint)?;
        debug!(
            endpoint = %endpoint,
            verb = %template.verb,
            relative_path = %template.relative_path,
            action = ?action,
            "Starting API call"
        );

        let scope = cache_scope(&endpoint, template, self.config);
        if let Some(response) = self.cache.and_then(|cache| cache.lookup(&scope, template)) {
            debug!(action = ?action, "Serving API call from cache");
            return Ok(CallOutput::Response {
                response,
                from_cache: true,
            });
        }

        // Signers may move the query into a POST body, so failures are
        // classified against the unsigned call target.
        let target = with_query(&template.relative_path, &template.params);
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let mut connection = endpoint.clone();
            let mut request = template.clone();

            let ctx = SigningContext {
                credentials: self.credentials,
                config: self.config,
                now: self.clock.now(),
                action,
            };
            match self
                .signer
                .sign(&ctx, &mut connection, &mut request)
                .map_err(signer_error)?
            {
                SignOutcome::Done(url) => {
                    debug!(host = %connection.host, "API call finished by signer");
                    return Ok(CallOutput::Link(url));
                }
                SignOutcome::Signed => {}
            }

            let transport = self
                .transport
                .ok_or_else(|| ClientError::Config("no transport configured".to_owned()))?;

            debug!(attempt = attempts, host = %connection.host, path = %request.path, "Sending request");
            let (failure, error) = match transport.send(&connection, &request).await {
                Ok(response) if response.is_success() => {
                    if let Some(cache) = self.cache {
                        cache.store(&scope, template, &response);
                    }
                    debug!(attempt = attempts, status = response.status, "API call succeeded");
                    return Ok(CallOutput::Response {
                        response,
                        from_cache: false,
                    });
                }
                Ok(response) => (
                    AttemptFailure::from_response(target.as_str(), &response),
                    ClientError::Api(ApiError::from_response(&response)),
                ),
                Err(err) => (
                    AttemptFailure::from_transport(target.as_str(), err.clone()),
                    ClientError::Transport(err),
                ),
            };

            let decision = self.classifier.classify(&failure);
            let can_retry = self.policy.allows_another(attempts, started.elapsed());
            warn!(
                attempt = attempts,
                status = ?failure.status,
                action = ?decision,
                error = %error,
                "API call attempt failed"
            );

            let retry = match decision {
                ErrorAction::Retry => can_retry,
                ErrorAction::AbortOnTimeout => can_retry && !failure.is_timeout(),
                ErrorAction::Abort | ErrorAction::DisconnectAndAbort => false,
            };
            if retry {
                let delay = self.policy.backoff_for(attempts);
                debug!(delay_ms = delay.as_millis(), "Retrying API call");
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(match decision {
                ErrorAction::Retry => ClientError::RetriesExhausted {
                    attempts,
                    last: Box::new(error),
                },
                ErrorAction::DisconnectAndAbort => {
                    transport.disconnect(&connection).await;
                    aborted(attempts, error)
                }
                ErrorAction::Abort | ErrorAction::AbortOnTimeout => aborted(attempts, error),
            });
        }
    }
}

/// Endpoint and API version a cached response belongs to.
fn cache_scope(
    endpoint: &ConnectionDescriptor,
    template: &RequestDescriptor,
    config: &ClientConfig,
) -> String {
    let version = template
        .params
        .get("Version")
        .map(String::as_str)
        .or(config.api_version.as_deref())
        .unwrap_or_default();
    format!("{endpoint}@{version}")
}

fn aborted(attempts: u32, error: ClientError) -> ClientError {
    ClientError::Aborted {
        attempts,
        last: Box::new(error),
    }
}

fn signer_error(error: SignerError) -> ClientError {
    match error {
        SignerError::Auth(err) => ClientError::Auth(err),
        SignerError::Core(err) => ClientError::Core(err),
        other => ClientError::Signer(other),
    }
}
