use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FoundryError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A credential source that is not configured in this environment.
    /// Only the default chain inspects this; it is skipped there.
    #[error("Credential unavailable: {0}")]
    CredentialUnavailable(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Rate limited: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Service error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Service {
        status: Option<u16>,
        message: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type FoundryResult<T> = Result<T, FoundryError>;

impl FoundryError {
    /// Rate limits and 5xx-class failures may succeed on a later attempt.
    ///
    /// A `Service` error without a status (an unreadable body, a failed
    /// response) came back from a completed request and is not retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            FoundryError::RateLimit { .. } => true,
            FoundryError::Service {
                status: Some(status),
                ..
            } => *status >= 500,
            _ => false,
        }
    }

    pub fn service<S: Into<String>>(message: S) -> Self {
        FoundryError::Service {
            status: None,
            message: message.into(),
        }
    }

    /// Map a non-success HTTP status and its body onto the error taxonomy.
    pub fn from_status(status: StatusCode, body: &str, retry_after: Option<Duration>) -> Self {
        let message = error_message(body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("no response body")
                    .to_string()
            } else {
                body.trim().to_string()
            }
        });

        match status {
            StatusCode::UNAUTHORIZED => FoundryError::Authentication(message),
            StatusCode::FORBIDDEN => FoundryError::Permission(message),
            StatusCode::NOT_FOUND => FoundryError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => FoundryError::RateLimit {
                message,
                retry_after,
            },
            status if status.is_server_error() => FoundryError::Service {
                status: Some(status.as_u16()),
                message,
            },
            _ => FoundryError::InvalidRequest(format!("{}: {}", status.as_u16(), message)),
        }
    }
}

impl From<reqwest::Error> for FoundryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FoundryError::Connection(format!("request timed out: {}", err))
        } else if err.is_connect() || err.is_request() {
            FoundryError::Connection(err.to_string())
        } else if err.is_decode() {
            FoundryError::service(format!("could not decode response: {}", err))
        } else if let Some(status) = err.status() {
            FoundryError::from_status(status, &err.to_string(), None)
        } else {
            FoundryError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FoundryError {
    fn from(err: serde_json::Error) -> Self {
        FoundryError::service(format!("malformed response body: {}", err))
    }
}

/// Pull a readable message out of a JSON error body.
///
/// Handles `{"error": {"code", "message"}}`, `{"error": "..."}` and
/// `{"message": "..."}`. Returns `None` when the body is not JSON or has none of these.
pub fn error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    error_object_message(&json)
}

pub(crate) fn error_object_message(json: &Value) -> Option<String> {
    if let Some(error) = json.get("error") {
        if let Some(message) = error.get("message").and_then(|v| v.as_str()) {
            return Some(match error.get("code").and_then(|v| v.as_str()) {
                Some(code) => format!("{} (code: {})", message, code),
                None => message.to_string(),
            });
        }
        if let Some(message) = error.as_str() {
            return Some(message.to_string());
        }
    }

    json.get("message")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}
