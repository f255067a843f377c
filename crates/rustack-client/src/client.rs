//! The client entry points.

use std::sync::Arc;

use rustack_client_core::params::flatten;
use rustack_client_core::{Body, ClientConfig, Credentials, HttpHeaders, RequestDescriptor, Verb};
use serde_json::Value;

use crate::cache::CacheValidator;
use crate::clock::{Clock, SystemClock};
use crate::error::{ClientError, ClientResult};
use crate::pipeline::{CallOutput, Pipeline};
use crate::presets::{describe_cache_pattern, ec2_error_patterns, query_error_patterns};
use crate::retry::{ErrorClassifier, ErrorPattern, RetryPolicy};
use crate::signer::{QuerySigner, RequestSigner, S3LinkSigner, S3Signer};
use crate::transport::Transport;

/// An already resolved API request: what an operation catalog produces.
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    /// HTTP verb.
    pub verb: Verb,
    /// Path relative to the endpoint.
    pub relative_path: String,
    /// Nested parameters; flattened before signing.
    pub params: Value,
    /// Request headers.
    pub headers: HttpHeaders,
    /// Request body.
    pub body: Body,
    /// Bucket for storage-style APIs.
    pub bucket: Option<String>,
    /// Logical action name, for signers that route on it.
    pub action: Option<String>,
}

impl ApiRequest {
    /// Request for `verb` on `relative_path`.
    pub fn new(verb: Verb, relative_path: impl Into<String>) -> Self {
        Self {
            verb,
            relative_path: relative_path.into(),
            ..Self::default()
        }
    }

    /// Set the nested parameters.
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Add a header value.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the bucket.
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Set the action name.
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    fn into_descriptor(self) -> ClientResult<(RequestDescriptor, Option<String>)> {
        let params = match &self.params {
            Value::Null => Default::default(),
            Value::Object(map) => flatten(map),
            _ => {
                return Err(ClientError::Config(
                    "request parameters must be a mapping".to_owned(),
                ));
            }
        };
        let descriptor = RequestDescriptor {
            verb: self.verb,
            relative_path: self.relative_path,
            path: String::new(),
            params,
            headers: self.headers,
            body: self.body,
            bucket: self.bucket,
        };
        Ok((descriptor, self.action))
    }
}

/// A client for one AWS API family.
///
/// Holds credentials, configuration and the collaborators every call shares.
/// Calls own their request state, so one client can serve concurrent callers.
///
/// # Examples
///
/// ```
/// use rustack_client::ApiClient;
/// use rustack_client_core::{ClientConfig, Credentials};
///
/// # tokio_test::block_on(async {
/// let config = ClientConfig::builder().endpoint("https://s3.amazonaws.com").build();
/// let client = ApiClient::s3_links(Credentials::new("AKID", "secret"), config);
/// let output = client.presign("my-bucket", "kd/banana.jpg").await.unwrap();
/// assert!(output.link().unwrap().starts_with("https://my-bucket.s3.amazonaws.com/kd/banana.jpg?"));
/// # });
/// ```
#[derive(Debug)]
pub struct ApiClient {
    credentials: Credentials,
    config: ClientConfig,
    signer: Arc<dyn RequestSigner>,
    transport: Option<Arc<dyn Transport>>,
    classifier: ErrorClassifier,
    cache: Option<Arc<CacheValidator>>,
    clock: Arc<dyn Clock>,
}

impl ApiClient {
    /// Client signing with `signer`. No transport, no error patterns (every
    /// failure aborts) and no cache until configured.
    pub fn new(
        credentials: Credentials,
        config: ClientConfig,
        signer: impl RequestSigner + 'static,
    ) -> Self {
        Self {
            credentials,
            config,
            signer: Arc::new(signer),
            transport: None,
            classifier: ErrorClassifier::default(),
            cache: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// EC2-style query API client: SigV2 query signing, the EC2 error
    /// patterns and, when `cache_enabled`, the `Describe*` cache.
    #[must_use]
    pub fn ec2(credentials: Credentials, config: ClientConfig) -> Self {
        let patterns = ec2_error_patterns(&config);
        let cache_enabled = config.cache_enabled;
        let client = Self::new(credentials, config, QuerySigner).with_error_patterns(patterns);
        if cache_enabled {
            client.with_cache(Arc::new(CacheValidator::new(vec![describe_cache_pattern()])))
        } else {
            client
        }
    }

    /// Generic query API client with the generic query error patterns.
    #[must_use]
    pub fn query(credentials: Credentials, config: ClientConfig) -> Self {
        let patterns = query_error_patterns(&config);
        Self::new(credentials, config, QuerySigner).with_error_patterns(patterns)
    }

    /// S3 REST client.
    #[must_use]
    pub fn s3(credentials: Credentials, config: ClientConfig) -> Self {
        Self::new(credentials, config, S3Signer::new())
    }

    /// S3 presigned link client; needs no transport.
    #[must_use]
    pub fn s3_links(credentials: Credentials, config: ClientConfig) -> Self {
        Self::new(credentials, config, S3LinkSigner)
    }

    /// Use `transport` to send requests.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the error classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replace the error patterns, keeping the classifier's default sampler.
    #[must_use]
    pub fn with_error_patterns(self, patterns: Vec<ErrorPattern>) -> Self {
        self.with_classifier(ErrorClassifier::new(patterns))
    }

    /// Serve and store responses through `cache`. The cache may be shared
    /// between clients; entries are scoped by endpoint and API version.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<CacheValidator>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Client credentials.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The response cache, if one is configured.
    #[must_use]
    pub fn cache(&self) -> Option<&CacheValidator> {
        self.cache.as_deref()
    }

    /// Call a query API action: `Action` plus the flattened `params`, sent as
    /// GET on the endpoint path.
    ///
    /// # Errors
    ///
    /// Fails with [`ClientError::Config`] if `params` is neither a mapping nor
    /// `null`, and with whatever the pipeline reports otherwise.
    pub async fn call(&self, action: &str, params: Value) -> ClientResult<CallOutput> {
        let mut request = ApiRequest::new(Verb::Get, "")
            .with_params(params)
            .with_action(action);
        if let Value::Object(map) = &mut request.params {
            map.insert("Action".to_owned(), Value::String(action.to_owned()));
        } else if request.params.is_null() {
            request.params = serde_json::json!({ "Action": action });
        }
        self.request(request).await
    }

    /// Run an arbitrary resolved request.
    pub async fn request(&self, request: ApiRequest) -> ClientResult<CallOutput> {
        let (descriptor, action) = request.into_descriptor()?;
        self.pipeline().run(&descriptor, action.as_deref()).await
    }

    /// Presign a GET for `key` in `bucket`.
    pub async fn presign(&self, bucket: &str, key: &str) -> ClientResult<CallOutput> {
        let relative_path = if key.is_empty() {
            bucket.to_owned()
        } else {
            format!("{bucket}/{key}")
        };
        self.request(ApiRequest::new(Verb::Get, relative_path)).await
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline {
            credentials: &self.credentials,
            config: &self.config,
            signer: self.signer.as_ref(),
            transport: self.transport.as_deref(),
            classifier: &self.classifier,
            cache: self.cache.as_deref(),
            clock: self.clock.as_ref(),
            policy: RetryPolicy::from_config(&self.config),
        }
    }
}
