//! Provider error extraction from failed responses.
//!
//! AWS services report errors in a handful of shapes:
//!
//! - query APIs: `<Response><Errors><Error><Code/><Message/></Error></Errors><RequestID/></Response>`
//! - REST/XML APIs: `<ErrorResponse><Error><Type/><Code/><Message/></Error><RequestId/></ErrorResponse>`
//! - S3: `<Error><Code/><Message/><RequestId/></Error>`
//! - JSON-RPC APIs: `{"__type": "...", "message": "..."}`
//!
//! [`ApiError::from_response`] reads whichever one is present.

use std::fmt;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde_json::Value;

use crate::transport::Response;

/// An error status returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct ApiError {
    /// HTTP status.
    pub status: u16,
    /// Provider error code (e.g. `InvalidParameterValue`).
    pub code: Option<String>,
    /// Provider error message.
    pub message: Option<String>,
    /// Provider request id.
    pub request_id: Option<String>,
    /// Raw body, kept when nothing structured could be extracted.
    pub body: String,
}

impl ApiError {
    /// Extract error details from a failed response.
    #[must_use]
    pub fn from_response(response: &Response) -> Self {
        let body = response.body_text();
        let content_type = response
            .headers
            .first("content-type")
            .unwrap_or_default()
            .to_ascii_lowercase();

        let mut error = Self {
            status: response.status,
            code: None,
            message: None,
            request_id: None,
            body,
        };

        let trimmed = error.body.trim_start();
        if content_type.contains("json") || trimmed.starts_with('{') {
            error.fill_from_json();
        } else if content_type.contains("xml") || trimmed.starts_with('<') {
            error.fill_from_xml();
        }
        error
    }

    fn fill_from_json(&mut self) {
        let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&self.body) else {
            return;
        };
        let text = |key: &str| map.get(key).and_then(Value::as_str).map(ToOwned::to_owned);
        self.code = text("__type").or_else(|| text("code"));
        self.message = text("message").or_else(|| text("Message"));
        self.request_id = text("RequestId").or_else(|| text("requestId"));
    }

    fn fill_from_xml(&mut self) {
        let mut reader = Reader::from_str(&self.body);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<String> = Vec::new();
        let mut codes = Vec::new();
        let mut messages = Vec::new();
        let mut error_type = None;
        let mut request_id = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    stack.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Text(e)) => {
                    let Ok(decoded) = e.decode() else { continue };
                    let text = quick_xml::escape::unescape(&decoded)
                        .map_or_else(|_| decoded.to_string(), |t| t.to_string());
                    let in_error = stack.len() >= 2 && stack[stack.len() - 2] == "Error";
                    match stack.last().map(String::as_str) {
                        Some("Code") if in_error => codes.push(text),
                        Some("Message") if in_error => messages.push(text),
                        Some("Type") if in_error => error_type = Some(text),
                        Some("RequestId" | "RequestID") => request_id = Some(text),
                        _ => {}
                    }
                }
                Ok(Event::Eof) | Err(_) => break,
                _ => {}
            }
        }

        if !codes.is_empty() {
            let code = codes.join("; ");
            self.code = Some(match error_type {
                Some(kind) => format!("{kind}.{code}"),
                None => code,
            });
        }
        if !messages.is_empty() {
            self.message = Some(messages.join("; "));
        }
        self.request_id = request_id;
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => write!(f, ": {code}: {message}")?,
            (Some(code), None) => write!(f, ": {code}")?,
            (None, Some(message)) => write!(f, ": {message}")?,
            (None, None) if !self.body.trim().is_empty() => write!(f, ": {}", self.body.trim())?,
            (None, None) => {}
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " (RequestID: {request_id})")?;
        }
        Ok(())
    }
}
