//! Error handling for the REST API server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use resurface_core::error::ResurfaceError;
use serde::Serialize;
use std::fmt;
use tracing::error;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    // Common error constructors
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

// Convert from resurface-core errors
impl From<ResurfaceError> for ApiError {
    fn from(err: ResurfaceError) -> Self {
        let status = match &err {
            ResurfaceError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            ResurfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ResurfaceError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ResurfaceError::Configuration(_) | ResurfaceError::Parse { .. } => {
                StatusCode::BAD_REQUEST
            }
            ResurfaceError::Database { .. }
            | ResurfaceError::Io(_)
            | ResurfaceError::Serialization(_)
            | ResurfaceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %err, "Request failed");
        }

        let api_error = ApiError::new(status, err.code().as_str(), err.to_string());
        match err.suggestion() {
            Some(suggestion) => {
                api_error.with_details(serde_json::json!({ "suggestion": suggestion }))
            }
            None => api_error,
        }
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
