//! Per-attempt request and connection descriptors.
//!
//! A [`RequestDescriptor`] is created fresh for every attempt of a call and
//! mutated in place by the signing stage; a [`ConnectionDescriptor`] describes
//! where it is sent and may be rewritten by a signer (S3 promotes DNS-compatible
//! buckets into the host).

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use crate::content::contentify;
use crate::error::{CoreError, CoreResult};
use crate::headers::HttpHeaders;
use crate::params::ParamMap;
use crate::types::Verb;

/// A streaming payload the transport reads on its own.
///
/// Signers never read a stream; SigV4 marks it `UNSIGNED-PAYLOAD`.
pub trait PayloadStream: fmt::Debug + Send + Sync {
    /// Total length in bytes, if known up front.
    fn content_length(&self) -> Option<u64>;
}

/// A request body.
#[derive(Debug, Clone, Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// Raw bytes, sent as-is.
    Bytes(Bytes),
    /// A structured tree awaiting content-type specific serialization.
    Tree(Value),
    /// A stream the transport consumes.
    Stream(Arc<dyn PayloadStream>),
}

impl Body {
    /// Whether the body is absent or has no bytes.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::Tree(value) => match value {
                Value::Null => true,
                Value::Object(map) => map.is_empty(),
                Value::Array(items) => items.is_empty(),
                Value::String(s) => s.is_empty(),
                _ => false,
            },
            Self::Stream(_) => false,
        }
    }

    /// Whether the body is a stream.
    #[must_use]
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Serialize a [`Body::Tree`] into bytes for `content_type`. Other bodies
    /// are left untouched.
    pub fn contentify(&mut self, content_type: &str) -> CoreResult<()> {
        if let Self::Tree(tree) = self {
            let bytes = match tree {
                Value::String(s) => s.clone().into_bytes(),
                other => contentify(other, content_type)?,
            };
            *self = Self::Bytes(Bytes::from(bytes));
        }
        Ok(())
    }

    /// The bytes a signer hashes. Streams have none; an unserialized tree is
    /// rendered as JSON.
    #[must_use]
    pub fn signable_bytes(&self) -> Option<Bytes> {
        match self {
            Self::Empty => Some(Bytes::new()),
            Self::Bytes(bytes) => Some(bytes.clone()),
            Self::Tree(Value::String(s)) => Some(Bytes::from(s.clone())),
            Self::Tree(tree) => Some(Bytes::from(tree.to_string())),
            Self::Stream(_) => None,
        }
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Self::Bytes(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Self::Tree(value)
    }
}

/// One attempt's request: verb, paths, flat params, headers, body and the
/// optional bucket used by storage signers.
///
/// `relative_path` is what the caller asked for; `path` is what goes on the
/// wire and is written by the signer (including any query string).
#[derive(Debug, Clone, Default)]
pub struct RequestDescriptor {
    /// HTTP verb.
    pub verb: Verb,
    /// Caller-supplied path, relative to the endpoint.
    pub relative_path: String,
    /// Final wire path including the query string, set by the signer.
    pub path: String,
    /// Flattened query parameters.
    pub params: ParamMap,
    /// Request headers.
    pub headers: HttpHeaders,
    /// Request body.
    pub body: Body,
    /// Bucket (or other container identifier) for storage-style signers.
    pub bucket: Option<String>,
}

impl RequestDescriptor {
    /// Create a descriptor for `verb` on `relative_path`.
    pub fn new(verb: Verb, relative_path: impl Into<String>) -> Self {
        Self {
            verb,
            relative_path: relative_path.into(),
            ..Self::default()
        }
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
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

    /// Build an [`http::Request`] for a transport, addressed through `connection`.
    pub fn to_http_request(
        &self,
        connection: &ConnectionDescriptor,
    ) -> CoreResult<http::Request<Body>> {
        let mut builder = http::Request::builder()
            .method(http::Method::from(self.verb))
            .uri(connection.url_for(&self.path));

        for (name, values) in self.headers.iter() {
            for value in values {
                builder = builder.header(name, value.as_str());
            }
        }

        builder
            .body(self.body.clone())
            .map_err(|e| CoreError::Internal(anyhow::Error::new(e).context("building HTTP request")))
    }
}

/// Where a request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// `http` or `https`.
    pub scheme: String,
    /// Host name, without port.
    pub host: String,
    /// Explicit port, if any.
    pub port: Option<u16>,
    /// Path prefix of the endpoint (`/` when none).
    pub base_path: String,
}

impl ConnectionDescriptor {
    /// Parse an endpoint URL such as `https://ec2.us-east-1.amazonaws.com/`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rustack_client_core::ConnectionDescriptor;
    ///
    /// let conn = ConnectionDescriptor::parse("https://s3.amazonaws.com:8443/base").unwrap();
    /// assert_eq!(conn.host, "s3.amazonaws.com");
    /// assert_eq!(conn.authority(), "s3.amazonaws.com:8443");
    /// assert_eq!(conn.base_path, "/base");
    /// ```
    pub fn parse(endpoint: &str) -> CoreResult<Self> {
        let uri: http::Uri = endpoint
            .parse()
            .map_err(|e: http::uri::InvalidUri| CoreError::InvalidEndpoint(format!("{endpoint}: {e}")))?;

        let scheme = uri
            .scheme_str()
            .ok_or_else(|| CoreError::InvalidEndpoint(format!("{endpoint}: missing scheme")))?
            .to_ascii_lowercase();
        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CoreError::InvalidEndpoint(format!("{endpoint}: missing host")))?
            .to_ascii_lowercase();

        let base_path = match uri.path() {
            "" => "/".to_owned(),
            path => path.to_owned(),
        };

        Ok(Self {
            scheme,
            host,
            port: uri.port_u16(),
            base_path,
        })
    }

    /// `host[:port]`, omitting the default port of the scheme.
    #[must_use]
    pub fn authority(&self) -> String {
        match self.port {
            Some(port) if !self.is_default_port(port) => format!("{}:{port}", self.host),
            _ => self.host.clone(),
        }
    }

    /// Absolute URL for a wire path (which may carry a query string).
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        let path = if path.starts_with('/') {
            path.to_owned()
        } else {
            format!("/{path}")
        };
        format!("{}://{}{path}", self.scheme, self.authority())
    }

    /// A copy of this descriptor pointing at another host.
    #[must_use]
    pub fn with_host(&self, host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..self.clone()
        }
    }

    fn is_default_port(&self, port: u16) -> bool {
        matches!((self.scheme.as_str(), port), ("http", 80) | ("https", 443))
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.authority(), self.base_path)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug)]
    struct FixedStream;

    impl PayloadStream for FixedStream {
        fn content_length(&self) -> Option<u64> {
            Some(10)
        }
    }

    #[test]
    fn test_should_parse_endpoint_without_path() {
        let conn = ConnectionDescriptor::parse("https://EC2.us-east-1.amazonaws.com").unwrap();
        assert_eq!(conn.scheme, "https");
        assert_eq!(conn.host, "ec2.us-east-1.amazonaws.com");
        assert_eq!(conn.port, None);
        assert_eq!(conn.base_path, "/");
    }

    #[test]
    fn test_should_omit_default_port_from_authority() {
        let conn = ConnectionDescriptor::parse("https://s3.amazonaws.com:443").unwrap();
        assert_eq!(conn.authority(), "s3.amazonaws.com");
        assert_eq!(
            conn.url_for("/bucket/key?acl="),
            "https://s3.amazonaws.com/bucket/key?acl="
        );
    }

    #[test]
    fn test_should_reject_endpoint_without_scheme() {
        let result = ConnectionDescriptor::parse("s3.amazonaws.com");
        assert!(matches!(result, Err(CoreError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_should_contentify_tree_bodies_only() {
        let mut body = Body::Tree(json!({"a": 1}));
        body.contentify("application/json").unwrap();
        assert!(matches!(&body, Body::Bytes(b) if b.as_ref() == br#"{"a":1}"#));

        let mut raw = Body::from("banana");
        raw.contentify("application/json").unwrap();
        assert!(matches!(&raw, Body::Bytes(b) if b.as_ref() == b"banana"));
    }

    #[test]
    fn test_should_report_blank_bodies() {
        assert!(Body::Empty.is_blank());
        assert!(Body::from("").is_blank());
        assert!(Body::Tree(json!({})).is_blank());
        assert!(!Body::from("x").is_blank());
        assert!(!Body::Stream(Arc::new(FixedStream)).is_blank());
    }

    #[test]
    fn test_should_not_expose_stream_bytes_for_signing() {
        assert!(Body::Stream(Arc::new(FixedStream)).signable_bytes().is_none());
        assert_eq!(Body::Empty.signable_bytes(), Some(Bytes::new()));
    }

    #[test]
    fn test_should_build_http_request() {
        let conn = ConnectionDescriptor::parse("https://sqs.us-east-1.amazonaws.com").unwrap();
        let mut request = RequestDescriptor::new(Verb::Post, "queue")
            .with_header("Content-Type", "text/plain")
            .with_body("hello");
        request.path = "/queue?Action=SendMessage".to_owned();

        let http_request = request.to_http_request(&conn).unwrap();
        assert_eq!(http_request.method(), http::Method::POST);
        assert_eq!(
            http_request.uri().to_string(),
            "https://sqs.us-east-1.amazonaws.com/queue?Action=SendMessage"
        );
        assert_eq!(http_request.headers()["content-type"], "text/plain");
    }
}
