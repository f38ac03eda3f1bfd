//! Error types for the demo server.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors returned by the HTTP handlers.
///
/// Failed tool calls are not among them: those are answered with a
/// successful HTTP response carrying an MCP error result.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The request body was not a valid tool call.
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidBody(rejection) => rejection.status(),
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

/// Errors raised while loading the server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override could not be parsed.
    #[error("invalid {key} value: {value}")]
    InvalidOverride {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
    },

    /// The wallet header name is not a valid HTTP header name.
    #[error("invalid wallet header name: {0}")]
    InvalidHeader(String),
}

/// Errors that stop the server from starting or running.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Configuration file problem.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Payment settings problem.
    #[error(transparent)]
    Settings(#[from] paylink::SettingsError),

    /// Binding or serving failed.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

