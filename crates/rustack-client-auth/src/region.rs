//! Host to `{service, region}` resolution for SigV4 credential scopes.
//!
//! Rules are tried in order. Global services (IAM, Route53) and legacy S3 host
//! shapes resolve through explicit overrides; everything else falls back to
//! reading `<service>.<region>.amazonaws.com[.cn]`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::AuthError;

/// Service and region a request is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceScope {
    /// Service name, e.g. `ec2`.
    pub service: String,
    /// Region name, e.g. `us-east-1`.
    pub region: String,
}

/// Where a rule takes a scope component from.
#[derive(Debug, Clone, Copy)]
enum Part {
    Fixed(&'static str),
    Capture(usize),
}

#[derive(Debug)]
struct HostRule {
    pattern: Regex,
    service: Part,
    region: Part,
}

fn rule(pattern: &str, service: Part, region: Part) -> HostRule {
    HostRule {
        pattern: Regex::new(&format!("(?i){pattern}")).expect("host rule is a valid regex"),
        service,
        region,
    }
}

static HOST_RULES: LazyLock<Vec<HostRule>> = LazyLock::new(|| {
    use Part::{Capture, Fixed};
    vec![
        rule(r"^iam\.amazonaws\.com$", Fixed("iam"), Fixed("us-east-1")),
        rule(r"^iam\.amazonaws\.com\.cn$", Fixed("iam"), Fixed("cn-north-1")),
        rule(r"^route53\.amazonaws\.com$", Fixed("route53"), Fixed("us-east-1")),
        rule(r"^(.*\.)?s3\.amazonaws\.com$", Fixed("s3"), Fixed("us-east-1")),
        rule(r"^(.*\.)?s3-external-1\.amazonaws\.com$", Fixed("s3"), Fixed("us-east-1")),
        rule(r"s3-website(-|\.)([^.]+)\.amazonaws\.com(\.cn)?$", Fixed("s3"), Capture(2)),
        rule(r"^(.*\.)?s3-([^.]+)\.amazonaws\.com(\.cn)?$", Fixed("s3"), Capture(2)),
        rule(r"^(.*\.)?s3\.([^.]+)\.amazonaws\.com(\.cn)?$", Fixed("s3"), Capture(2)),
        rule(r"^([^.]+)\.([^.]+)\.amazonaws\.com(\.cn)?$", Capture(1), Capture(2)),
    ]
});

/// Resolve the SigV4 service and region for `host`.
///
/// # Errors
///
/// Returns [`AuthError::UnresolvableService`] when no rule matches and
/// [`AuthError::UnresolvableRegion`] when the matching rule leaves the region
/// empty. Both are configuration errors.
///
/// # Examples
///
/// ```
/// use rustack_client_auth::region::resolve_service_and_region;
///
/// let scope = resolve_service_and_region("ec2.us-west-2.amazonaws.com").unwrap();
/// assert_eq!(scope.service, "ec2");
/// assert_eq!(scope.region, "us-west-2");
/// ```
pub fn resolve_service_and_region(host: &str) -> Result<ServiceScope, AuthError> {
    let matched = HOST_RULES
        .iter()
        .find_map(|rule| rule.pattern.captures(host).map(|caps| (rule, caps)));

    let Some((rule, caps)) = matched else {
        return Err(AuthError::UnresolvableService(host.to_owned()));
    };

    let extract = |part: Part| -> String {
        match part {
            Part::Fixed(value) => value.to_owned(),
            Part::Capture(idx) => caps
                .get(idx)
                .map(|m| m.as_str().to_ascii_lowercase())
                .unwrap_or_default(),
        }
    };

    let service = extract(rule.service);
    if service.is_empty() {
        return Err(AuthError::UnresolvableService(host.to_owned()));
    }
    let region = extract(rule.region);
    if region.is_empty() {
        return Err(AuthError::UnresolvableRegion(host.to_owned()));
    }

    Ok(ServiceScope { service, region })
}
