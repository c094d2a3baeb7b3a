// Error types for the cachegate proxy
// Author: kelexine (https://github.com/kelexine)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Upstream timed out after {0}ms")]
    Timeout(u64),

    #[error("Cache storage error: {0}")]
    Storage(String),

    #[error("Precache failed for {path}: {reason}")]
    Precache { path: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Convert GatewayError to HTTP responses for Axum
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            GatewayError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            GatewayError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "upstream_timeout"),
            GatewayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request_error"),
            GatewayError::Config(_) | GatewayError::ConfigParsing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            GatewayError::Storage(_) | GatewayError::Io(_) | GatewayError::Json(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
            GatewayError::Precache { .. } => (StatusCode::SERVICE_UNAVAILABLE, "install_error"),
            GatewayError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = json!({
            "type": "error",
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
