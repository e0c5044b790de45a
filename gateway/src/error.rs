//! Error types for the gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::refresh::RefreshError;

/// Errors surfaced to callers of the proxy and auxiliary routes.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Unknown backend key.
    #[error("{0}")]
    NotFound(String),

    /// Backend registered but not running, or unreachable.
    #[error("{0}")]
    Unavailable(String),

    /// Backend did not answer within the configured bound.
    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    pub fn model_not_found(key: &str) -> Self {
        Self::NotFound(format!("Model {} not found", key))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Unavailable(_) => "unavailable",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Classify a failed backend call.
    pub fn from_backend(err: reqwest::Error, key: &str, port: u16) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("Timeout connecting to model {}", key))
        } else if err.is_connect() {
            Self::Unavailable(format!("Cannot connect to model {} on port {}", key, port))
        } else {
            Self::Internal(format!("Error proxying to model {}: {}", key, err))
        }
    }
}

impl From<RefreshError> for GatewayError {
    fn from(err: RefreshError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
