//! Response caching for idempotent calls.
//!
//! A [`CachePattern`] says which calls may be served from memory: the verb and
//! path must match, and the flattened parameters may not contain anything
//! beyond [`COMMON_QUERY_PARAMS`] and the pattern's own allow-list. Stored
//! responses are normalized first, so volatile fields (request ids) do not
//! make equal results look different.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use regex::Regex;
use rustack_client_auth::path::with_query;
use rustack_client_core::{RequestDescriptor, Verb};
use tracing::debug;

use crate::transport::Response;

/// Parameters that carry signing and routing plumbing only.
pub const COMMON_QUERY_PARAMS: &[&str] = &[
    "Action",
    "AWSAccessKeyId",
    "Expires",
    "SecurityToken",
    "Signature",
    "SignatureMethod",
    "SignatureVersion",
    "Timestamp",
    "Version",
];

/// Derives the cache key for a request, or declines with `None`.
pub type CacheKeyFn = Arc<dyn Fn(&RequestDescriptor) -> Option<String> + Send + Sync>;

/// Normalizes a response before it is stored.
pub type NormalizeFn = Arc<dyn Fn(&Response) -> Response + Send + Sync>;

/// Which calls may be cached, and how.
#[derive(Clone)]
pub struct CachePattern {
    verbs: Vec<Verb>,
    path: Regex,
    allowed_params: Vec<String>,
    key: CacheKeyFn,
    normalize: NormalizeFn,
}

impl fmt::Debug for CachePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachePattern")
            .field("verbs", &self.verbs)
            .field("path", &self.path.as_str())
            .field("allowed_params", &self.allowed_params)
            .finish_non_exhaustive()
    }
}

impl CachePattern {
    /// Pattern over `verbs` and a path regex, keyed by `key`. Responses are
    /// stored unchanged until [`with_normalizer`](Self::with_normalizer) is set.
    pub fn new<K>(verbs: &[Verb], path: &str, key: K) -> Result<Self, regex::Error>
    where
        K: Fn(&RequestDescriptor) -> Option<String> + Send + Sync + 'static,
    {
        Ok(Self {
            verbs: verbs.to_vec(),
            path: Regex::new(path)?,
            allowed_params: Vec::new(),
            key: Arc::new(key),
            normalize: Arc::new(Response::clone),
        })
    }

    /// Allow extra parameters beyond the common set.
    #[must_use]
    pub fn with_allowed_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Set the normalization applied before storing.
    #[must_use]
    pub fn with_normalizer<N>(mut self, normalize: N) -> Self
    where
        N: Fn(&Response) -> Response + Send + Sync + 'static,
    {
        self.normalize = Arc::new(normalize);
        self
    }

    /// The cache key when this pattern applies to `request`.
    #[must_use]
    pub fn key_for(&self, request: &RequestDescriptor) -> Option<String> {
        if !self.verbs.contains(&request.verb) {
            return None;
        }

        let target = with_query(&request.relative_path, &request.params);
        if !self.path.is_match(&target) {
            return None;
        }

        let only_known_params = request.params.keys().all(|key| {
            COMMON_QUERY_PARAMS.contains(&key.as_str())
                || self.allowed_params.iter().any(|allowed| allowed == key)
        });
        if !only_known_params {
            return None;
        }

        (self.key)(request)
    }

    /// Apply the normalization.
    #[must_use]
    pub fn normalize(&self, response: &Response) -> Response {
        (self.normalize)(response)
    }
}

/// Applies cache patterns and holds the stored responses.
///
/// Entries are keyed by a scope (endpoint and API version, supplied by the
/// caller) plus the pattern key, so one validator can be shared by clients
/// talking to different regions. The store is a concurrent map; racing
/// writers for one key simply replace each other. Nothing expires: the store
/// holds at most one entry per scope and key, and [`clear`](Self::clear) is
/// how callers drop stale results.
#[derive(Debug, Default)]
pub struct CacheValidator {
    patterns: Vec<CachePattern>,
    store: DashMap<String, Response>,
}

impl CacheValidator {
    /// Validator over `patterns`, with an empty store.
    #[must_use]
    pub fn new(patterns: Vec<CachePattern>) -> Self {
        Self {
            patterns,
            store: DashMap::new(),
        }
    }

    /// The first pattern that applies to `request`, with its scoped key.
    fn matching(
        &self,
        scope: &str,
        request: &RequestDescriptor,
    ) -> Option<(&CachePattern, String)> {
        self.patterns.iter().find_map(|pattern| {
            pattern
                .key_for(request)
                .map(|key| (pattern, format!("{scope} {key}")))
        })
    }

    /// The stored response for `request` within `scope`, if a pattern applies
    /// and one exists.
    #[must_use]
    pub fn lookup(&self, scope: &str, request: &RequestDescriptor) -> Option<Response> {
        let (_, key) = self.matching(scope, request)?;
        let hit = self.store.get(&key).map(|entry| entry.value().clone());
        if hit.is_some() {
            debug!(key = %key, "Cache hit");
        }
        hit
    }

    /// Store the normalized `response` under `scope` when a pattern applies to
    /// `request`. Returns whether anything was stored.
    pub fn store(&self, scope: &str, request: &RequestDescriptor, response: &Response) -> bool {
        let Some((pattern, key)) = self.matching(scope, request) else {
            return false;
        };
        debug!(key = %key, "Storing response in cache");
        self.store.insert(key, pattern.normalize(response));
        true
    }

    /// Drop every stored response.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Number of stored responses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
