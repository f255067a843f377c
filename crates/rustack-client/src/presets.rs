//! Ready-made error and cache patterns.

use std::sync::LazyLock;

use regex::Regex;
use rustack_client_core::{ClientConfig, RequestDescriptor, Verb};

use crate::cache::CachePattern;
use crate::retry::{ErrorAction, ErrorPattern};
use crate::transport::Response;

static REQUEST_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<requestId>.+?</requestId>").expect("request id pattern is valid")
});

/// Error patterns for EC2-style query APIs.
///
/// Creating calls never retry after a timeout (they may have succeeded), a
/// capacity shortage is final, throttling and internal errors retry, and
/// server errors or a sampled share of client errors drop the connection.
#[must_use]
pub fn ec2_error_patterns(config: &ClientConfig) -> Vec<ErrorPattern> {
    build(
        &[
            (ErrorAction::AbortOnTimeout, Rule::Path("Action=(Run|Create|Purchase)")),
            (ErrorAction::Abort, Rule::Body("(?i)InsufficientInstanceCapacity")),
            (
                ErrorAction::Retry,
                Rule::Body("(?i)InternalError|Unavailable|Internal Server Error"),
            ),
            (
                ErrorAction::Retry,
                Rule::Body("(?i)Please try again|no response from|Request limit exceeded"),
            ),
        ],
        config,
    )
}

/// Error patterns for other query APIs.
#[must_use]
pub fn query_error_patterns(config: &ClientConfig) -> Vec<ErrorPattern> {
    build(
        &[
            (ErrorAction::AbortOnTimeout, Rule::Path("Action=Create")),
            (
                ErrorAction::Retry,
                Rule::Body("(?i)InternalError|Unavailable|Internal Server Error"),
            ),
        ],
        config,
    )
}

/// Cache pattern for `Describe*` calls without filters: keyed by `Action`,
/// with `<requestId>` stripped before storing.
#[must_use]
pub fn describe_cache_pattern() -> CachePattern {
    CachePattern::new(&[Verb::Get, Verb::Post], "Action=Describe", action_key)
        .expect("describe path pattern is valid")
        .with_normalizer(strip_request_id)
}

fn action_key(request: &RequestDescriptor) -> Option<String> {
    request.params.get("Action").cloned()
}

fn strip_request_id(response: &Response) -> Response {
    let body = REQUEST_ID.replace_all(&response.body_text(), "").into_owned();
    Response {
        status: response.status,
        headers: response.headers.clone(),
        body: body.into(),
    }
}

enum Rule {
    Path(&'static str),
    Body(&'static str),
}

/// Service-specific rules followed by the status rules every query API shares.
fn build(rules: &[(ErrorAction, Rule)], config: &ClientConfig) -> Vec<ErrorPattern> {
    let mut patterns: Vec<ErrorPattern> = rules
        .iter()
        .map(|(action, rule)| {
            match rule {
                Rule::Path(re) => ErrorPattern::path(*action, re),
                Rule::Body(re) => ErrorPattern::response(*action, re),
            }
            .expect("preset pattern is valid")
        })
        .collect();

    patterns.push(
        ErrorPattern::code(ErrorAction::DisconnectAndAbort, "5..|403|408")
            .expect("preset pattern is valid"),
    );
    patterns.push(
        ErrorPattern::code(ErrorAction::DisconnectAndAbort, "4..")
            .expect("preset pattern is valid")
            .with_probability(config.transient_4xx_probability),
    );
    patterns.push(ErrorPattern::connection_failure(ErrorAction::Retry));
    patterns
}
