//! Error classification and the retry budget.
//!
//! A failed attempt is described by an [`AttemptFailure`] and run through an
//! ordered list of [`ErrorPattern`]s. The first pattern whose trigger matches
//! (and whose probability gate, if any, passes) decides the [`ErrorAction`].
//! When nothing matches the classifier falls back to [`ErrorAction::Abort`].

use std::fmt;
use std::time::Duration;

use regex::Regex;
use rustack_client_core::ClientConfig;

use crate::transport::{Response, TransportError};

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorAction {
    /// Fail immediately.
    #[default]
    Abort,
    /// Fail if the attempt timed out or the retry budget is gone, retry otherwise.
    AbortOnTimeout,
    /// Reissue the request with a fresh signature.
    Retry,
    /// Tear down the connection, then fail.
    DisconnectAndAbort,
}

/// The attribute of a failed attempt a pattern inspects.
#[derive(Debug, Clone)]
pub enum ErrorTrigger {
    /// Regex over the call target: relative path plus the canonical query of
    /// the unsigned parameters.
    Path(Regex),
    /// Regex over the response body.
    Response(Regex),
    /// Regex over the three-digit status code, anchored at both ends.
    Code(Regex),
    /// Any connection-level failure reported by the transport.
    ConnectionFailure,
}

impl ErrorTrigger {
    fn matches(&self, failure: &AttemptFailure) -> bool {
        match self {
            Self::Path(re) => re.is_match(&failure.path),
            Self::Response(re) => failure.status.is_some() && re.is_match(&failure.body),
            Self::Code(re) => failure
                .status
                .is_some_and(|status| re.is_match(&status.to_string())),
            Self::ConnectionFailure => failure.transport.is_some(),
        }
    }
}

/// One classification rule.
#[derive(Debug, Clone)]
pub struct ErrorPattern {
    /// Action taken when the rule fires.
    pub action: ErrorAction,
    /// What the rule looks at.
    pub trigger: ErrorTrigger,
    /// Chance in `[0, 1]` that a matching attempt actually fires the rule.
    pub probability: Option<f64>,
}

impl ErrorPattern {
    /// Create a rule without a probability gate.
    #[must_use]
    pub fn new(action: ErrorAction, trigger: ErrorTrigger) -> Self {
        Self {
            action,
            trigger,
            probability: None,
        }
    }

    /// Rule over the request path.
    pub fn path(action: ErrorAction, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::new(action, ErrorTrigger::Path(Regex::new(pattern)?)))
    }

    /// Rule over the response body.
    pub fn response(action: ErrorAction, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::new(action, ErrorTrigger::Response(Regex::new(pattern)?)))
    }

    /// Rule over the status code, e.g. `5..|403`.
    pub fn code(action: ErrorAction, pattern: &str) -> Result<Self, regex::Error> {
        let anchored = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(Self::new(action, ErrorTrigger::Code(anchored)))
    }

    /// Rule over connection-level failures.
    #[must_use]
    pub fn connection_failure(action: ErrorAction) -> Self {
        Self::new(action, ErrorTrigger::ConnectionFailure)
    }

    /// Gate the rule behind a probability.
    #[must_use]
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = Some(probability.clamp(0.0, 1.0));
        self
    }

    fn fires(&self, failure: &AttemptFailure, sampler: &dyn Sampler) -> bool {
        if !self.trigger.matches(failure) {
            return false;
        }
        match self.probability {
            Some(probability) => sampler.sample() < probability,
            None => true,
        }
    }
}

/// The observable facts about one failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    /// Call target, `relative_path?canonical_query`, independent of where the
    /// signer put the parameters.
    pub path: String,
    /// HTTP status, absent for transport failures.
    pub status: Option<u16>,
    /// Response body text (empty for transport failures).
    pub body: String,
    /// The transport failure, if that is what happened.
    pub transport: Option<TransportError>,
}

impl AttemptFailure {
    /// Failure from an error-status response.
    #[must_use]
    pub fn from_response(path: impl Into<String>, response: &Response) -> Self {
        Self {
            path: path.into(),
            status: Some(response.status),
            body: response.body_text(),
            transport: None,
        }
    }

    /// Failure below HTTP.
    #[must_use]
    pub fn from_transport(path: impl Into<String>, error: TransportError) -> Self {
        Self {
            path: path.into(),
            status: None,
            body: String::new(),
            transport: Some(error),
        }
    }

    /// Whether the attempt ended in a transport timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.transport.as_ref().is_some_and(TransportError::is_timeout)
    }
}

/// Source of uniform samples in `[0, 1)` for probability gates.
pub trait Sampler: Send + Sync + fmt::Debug {
    /// Draw a sample.
    fn sample(&self) -> f64;
}

/// Thread-local RNG sampler.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSampler;

impl Sampler for RandomSampler {
    fn sample(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Always returns the same value; for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedSampler(pub f64);

impl Sampler for FixedSampler {
    fn sample(&self) -> f64 {
        self.0
    }
}

/// Ordered error patterns plus the sampler for their probability gates.
#[derive(Debug)]
pub struct ErrorClassifier {
    patterns: Vec<ErrorPattern>,
    sampler: Box<dyn Sampler>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ErrorClassifier {
    /// Classifier over `patterns`, sampled with [`RandomSampler`].
    #[must_use]
    pub fn new(patterns: Vec<ErrorPattern>) -> Self {
        Self {
            patterns,
            sampler: Box::new(RandomSampler),
        }
    }

    /// Replace the sampler.
    #[must_use]
    pub fn with_sampler(mut self, sampler: impl Sampler + 'static) -> Self {
        self.sampler = Box::new(sampler);
        self
    }

    /// The configured patterns, in evaluation order.
    #[must_use]
    pub fn patterns(&self) -> &[ErrorPattern] {
        &self.patterns
    }

    /// Pick the action for `failure`: the first firing pattern wins.
    #[must_use]
    pub fn classify(&self, failure: &AttemptFailure) -> ErrorAction {
        self.patterns
            .iter()
            .find(|pattern| pattern.fires(failure, self.sampler.as_ref()))
            .map_or(ErrorAction::Abort, |pattern| pattern.action)
    }
}

/// Attempt and deadline budget for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts, the first one included.
    pub max_attempts: u32,
    /// Wall-clock budget for the whole call.
    pub deadline: Duration,
    /// Delay before the first retry; doubled for each further retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

impl RetryPolicy {
    /// Policy from client configuration.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            deadline: config.retry_deadline(),
            backoff: config.retry_backoff(),
        }
    }

    /// Delay before attempt number `attempt + 1`, where `attempt` is 1-based.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(1 << shift)
    }

    /// Whether another attempt fits after `attempts` attempts and `elapsed` time.
    #[must_use]
    pub fn allows_another(&self, attempts: u32, elapsed: Duration) -> bool {
        attempts < self.max_attempts && elapsed + self.backoff_for(attempts) < self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_failure(path: &str, status: u16, body: &str) -> AttemptFailure {
        AttemptFailure::from_response(path, &Response::new(status, body.to_owned()))
    }

    #[test]
    fn test_should_let_first_matching_pattern_win() {
        let classifier = ErrorClassifier::new(vec![
            ErrorPattern::response(ErrorAction::Abort, "InsufficientInstanceCapacity").unwrap(),
            ErrorPattern::code(ErrorAction::Retry, "5..").unwrap(),
        ]);
        let failure = http_failure("/?Action=RunInstances", 500, "InsufficientInstanceCapacity");
        assert_eq!(classifier.classify(&failure), ErrorAction::Abort);

        let failure = http_failure("/?Action=RunInstances", 500, "oops");
        assert_eq!(classifier.classify(&failure), ErrorAction::Retry);
    }

    #[test]
    fn test_should_default_to_abort() {
        let classifier = ErrorClassifier::new(vec![
            ErrorPattern::code(ErrorAction::Retry, "5..").unwrap(),
        ]);
        assert_eq!(
            classifier.classify(&http_failure("/", 400, "bad")),
            ErrorAction::Abort
        );
    }

    #[test]
    fn test_should_anchor_status_patterns() {
        let pattern = ErrorPattern::code(ErrorAction::Retry, "40").unwrap();
        let classifier = ErrorClassifier::new(vec![pattern]);
        assert_eq!(
            classifier.classify(&http_failure("/", 403, "")),
            ErrorAction::Abort
        );
    }

    #[test]
    fn test_should_gate_patterns_by_probability() {
        let pattern = || {
            ErrorPattern::code(ErrorAction::DisconnectAndAbort, "4..")
                .unwrap()
                .with_probability(0.1)
        };
        let failure = http_failure("/", 404, "");

        let hit = ErrorClassifier::new(vec![pattern()]).with_sampler(FixedSampler(0.05));
        assert_eq!(hit.classify(&failure), ErrorAction::DisconnectAndAbort);

        let miss = ErrorClassifier::new(vec![pattern()]).with_sampler(FixedSampler(0.5));
        assert_eq!(miss.classify(&failure), ErrorAction::Abort);
    }

    #[test]
    fn test_should_match_connection_failures_only_for_transport_errors() {
        let classifier = ErrorClassifier::new(vec![ErrorPattern::connection_failure(
            ErrorAction::Retry,
        )]);
        let failure =
            AttemptFailure::from_transport("/", TransportError::Connection("reset".into()));
        assert_eq!(classifier.classify(&failure), ErrorAction::Retry);
        assert_eq!(
            classifier.classify(&http_failure("/", 500, "")),
            ErrorAction::Abort
        );
    }

    #[test]
    fn test_should_not_match_body_patterns_on_transport_errors() {
        let classifier = ErrorClassifier::new(vec![
            ErrorPattern::response(ErrorAction::Retry, ".*").unwrap(),
        ]);
        let failure = AttemptFailure::from_transport("/", TransportError::Timeout("slow".into()));
        assert!(failure.is_timeout());
        assert_eq!(classifier.classify(&failure), ErrorAction::Abort);
    }

    #[test]
    fn test_should_double_backoff_and_respect_budget() {
        let policy = RetryPolicy {
            max_attempts: 3,
            deadline: Duration::from_secs(10),
            backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
        assert!(policy.allows_another(1, Duration::ZERO));
        assert!(!policy.allows_another(3, Duration::ZERO));
        assert!(!policy.allows_another(1, Duration::from_secs(10)));
    }
}
