//! Rustack Presign - print presigned S3 links and signed query API URLs.
//!
//! Everything is computed locally; no request is sent.
//!
//! # Usage
//!
//! ```text
//! rustack-presign my-bucket photos/banana.jpg
//! rustack-presign --v2 my-bucket photos/banana.jpg
//! AWS_ENDPOINT_URL=https://ec2.us-east-1.amazonaws.com AWS_API_VERSION=2016-11-15 \
//!     rustack-presign --query DescribeInstances InstanceId=i-1 InstanceId=i-2
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AWS_ACCESS_KEY_ID` | *(required)* | Access key (falls back to `ACCESS_KEY`) |
//! | `AWS_SECRET_ACCESS_KEY` | *(required)* | Secret key (falls back to `SECRET_KEY`) |
//! | `AWS_ENDPOINT_URL` | `https://s3.amazonaws.com` | Service endpoint |
//! | `BUCKET` | *(unset)* | Bucket when not given as an argument |
//! | `KEY` | *(unset)* | Object key when not given as an argument |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//!
//! See `ClientConfig::from_env` for the remaining client settings.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rustack_client::signer::{QuerySigner, S3QueryLinkSigner};
use rustack_client::{ApiClient, RequestSigner, SigningContext};
use rustack_client_core::{
    ClientConfig, ConnectionDescriptor, Credentials, RequestDescriptor, Verb, flatten,
};
use serde_json::{Map, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// What to sign.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    /// A presigned GET link for an S3 object.
    Link {
        bucket: String,
        key: String,
        query_string_auth: bool,
    },
    /// A signed query API URL.
    Query {
        action: String,
        params: Vec<(String, String)>,
    },
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn parse_args(
    args: impl IntoIterator<Item = String>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Command> {
    let mut args = args.into_iter().peekable();

    if args.peek().is_some_and(|a| a == "--query") {
        args.next();
        let action = args.next().context("--query needs an action name")?;
        let params = args
            .map(|arg| {
                arg.split_once('=')
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .with_context(|| format!("expected Key=Value, got {arg}"))
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(Command::Query { action, params });
    }

    let query_string_auth = args.peek().is_some_and(|a| a == "--v2");
    if query_string_auth {
        args.next();
    }

    let bucket = args
        .next()
        .or_else(|| env("BUCKET"))
        .context("missing bucket (argument or BUCKET)")?;
    let key = args.next().or_else(|| env("KEY")).unwrap_or_default();
    if let Some(extra) = args.next() {
        bail!("unexpected argument: {extra}");
    }

    Ok(Command::Link {
        bucket,
        key,
        query_string_auth,
    })
}

/// Group repeated keys into lists so they flatten to `Key.1`, `Key.2`, ...
fn nest_params(params: &[(String, String)]) -> Map<String, Value> {
    let mut nested = Map::new();
    for (key, value) in params {
        let value = Value::String(value.clone());
        match nested.get_mut(key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                nested.insert(key.clone(), value);
            }
        }
    }
    nested
}

fn signed_query_url(
    credentials: &Credentials,
    config: &ClientConfig,
    action: &str,
    params: &[(String, String)],
) -> Result<String> {
    let mut connection = ConnectionDescriptor::parse(&config.endpoint)
        .with_context(|| format!("invalid endpoint: {}", config.endpoint))?;
    let mut request = RequestDescriptor::new(Verb::Get, "");
    request.params = flatten(&nest_params(params));
    request.params.insert("Action".to_owned(), action.to_owned());

    let ctx = SigningContext {
        credentials,
        config,
        now: Utc::now(),
        action: Some(action),
    };
    QuerySigner
        .sign(&ctx, &mut connection, &mut request)
        .context("signing query request")?;

    if request.verb != Verb::Get {
        bail!(
            "signed query is longer than {} bytes and must be sent as POST",
            config.max_get_path_length
        );
    }
    Ok(connection.url_for(&request.path))
}

async fn presigned_link(
    credentials: Credentials,
    config: ClientConfig,
    bucket: &str,
    key: &str,
    query_string_auth: bool,
) -> Result<String> {
    let client = if query_string_auth {
        ApiClient::new(credentials, config, S3QueryLinkSigner)
    } else {
        ApiClient::s3_links(credentials, config)
    };
    let output = client
        .presign(bucket, key)
        .await
        .with_context(|| format!("presigning {bucket}/{key}"))?;
    output
        .link()
        .map(ToOwned::to_owned)
        .context("signer did not produce a link")
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ClientConfig::from_env();
    init_tracing(&config.log_level)?;

    let command = parse_args(std::env::args().skip(1), |name| std::env::var(name).ok())?;
    let credentials = Credentials::from_env().context("loading credentials")?;

    info!(
        endpoint = %config.endpoint,
        virtual_hosting = config.virtual_hosting,
        access_key_id = %credentials.access_key_id(),
        "signing request"
    );
    debug!(command = ?command, "parsed arguments");

    let url = match command {
        Command::Link {
            bucket,
            key,
            query_string_auth,
        } => presigned_link(credentials, config, &bucket, &key, query_string_auth).await?,
        Command::Query { action, params } => {
            signed_query_url(&credentials, &config, &action, &params)?
        }
    };

    println!("{url}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_should_parse_link_arguments() {
        let command = parse_args(args(&["--v2", "my-bucket", "kd/banana.jpg"]), no_env).unwrap();
        assert_eq!(
            command,
            Command::Link {
                bucket: "my-bucket".to_owned(),
                key: "kd/banana.jpg".to_owned(),
                query_string_auth: true,
            }
        );
    }

    #[test]
    fn test_should_fall_back_to_environment() {
        let env = |name: &str| match name {
            "BUCKET" => Some("env-bucket".to_owned()),
            "KEY" => Some("env/key".to_owned()),
            _ => None,
        };
        let command = parse_args(Vec::new(), env).unwrap();
        assert_eq!(
            command,
            Command::Link {
                bucket: "env-bucket".to_owned(),
                key: "env/key".to_owned(),
                query_string_auth: false,
            }
        );
        assert!(parse_args(Vec::new(), no_env).is_err());
    }

    #[test]
    fn test_should_parse_query_arguments() {
        let command =
            parse_args(args(&["--query", "DescribeInstances", "InstanceId=i-1"]), no_env).unwrap();
        assert_eq!(
            command,
            Command::Query {
                action: "DescribeInstances".to_owned(),
                params: vec![("InstanceId".to_owned(), "i-1".to_owned())],
            }
        );
        assert!(parse_args(args(&["--query", "X", "oops"]), no_env).is_err());
    }

    #[test]
    fn test_should_index_repeated_query_params() {
        let credentials = Credentials::new("AKID", "secret");
        let config = ClientConfig::builder()
            .endpoint("https://ec2.us-east-1.amazonaws.com")
            .build();
        let params = vec![
            ("InstanceId".to_owned(), "i-1".to_owned()),
            ("InstanceId".to_owned(), "i-2".to_owned()),
        ];

        let url = signed_query_url(&credentials, &config, "DescribeInstances", &params).unwrap();

        assert!(url.starts_with("https://ec2.us-east-1.amazonaws.com/?AWSAccessKeyId=AKID&"));
        assert!(url.contains("&InstanceId.1=i-1&InstanceId.2=i-2&"));
    }
}
