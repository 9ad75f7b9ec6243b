use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatApiError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {0} {1}")]
    Status(StatusCode, String),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("request was cancelled")]
    Cancelled,
}

/// A single frame whose payload could not be parsed.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed frame payload {payload:?}: {source}")]
    MalformedPayload {
        payload: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<Value>,
    message: Option<String>,
}

/// Extract a human-readable message from an error response body.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        let from_error = match &parsed.error {
            Some(Value::String(message)) => non_empty_string(message),
            Some(Value::Object(fields)) => fields
                .get("message")
                .and_then(Value::as_str)
                .and_then(non_empty_string),
            _ => None,
        };
        if let Some(message) = from_error.or_else(|| {
            parsed
                .message
                .as_deref()
                .and_then(non_empty_string)
        }) {
            return message.to_owned();
        }
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

fn non_empty_string(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
