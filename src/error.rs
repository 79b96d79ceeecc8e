//! Error taxonomy and the JSON error body returned to callers.
//!
//! Every [`ProxyError`] is terminal for the request it belongs to and is turned
//! into an HTTP response at the handler boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::config::loader::ConfigError;

/// Fixed human-readable description attached to every 503.
pub const UNREACHABLE_MESSAGE: &str = "Could not reach the target service";

/// Errors produced while authenticating or forwarding a request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The server itself is misconfigured (deployment fault).
    #[error("{0}")]
    Configuration(String),

    /// The caller did not present a valid credential.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// A required payload field is missing or empty.
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// The payload is present but unusable.
    #[error("{0}")]
    BadRequest(String),

    /// No response was received from the target.
    #[error("Could not reach the target service: {details}")]
    ServiceUnavailable { details: String },

    /// The outbound request could not be constructed.
    #[error("{0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Configuration(_) | ProxyError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProxyError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ProxyError::MissingParameter(_) | ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Build the JSON body for this error.
    pub fn body(&self) -> ErrorBody {
        match self {
            ProxyError::MissingParameter(_) => ErrorBody {
                error: self.to_string(),
                message: None,
                details: None,
            },
            ProxyError::ServiceUnavailable { details } => ErrorBody {
                error: "Service Unavailable".to_string(),
                message: Some(UNREACHABLE_MESSAGE.to_string()),
                details: Some(details.clone()),
            },
            _ => ErrorBody {
                error: self
                    .status()
                    .canonical_reason()
                    .unwrap_or("Error")
                    .to_string(),
                message: Some(self.to_string()),
                details: None,
            },
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// Structured error body: `{error, message?, details?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Errors that stop the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render an error and its whole `source()` chain as one line.
///
/// reqwest keeps the useful part (e.g. "Connection refused") several sources
/// deep, so callers see `outer: inner: root`.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}
