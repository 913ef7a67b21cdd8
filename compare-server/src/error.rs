//! HTTP error mapping
//!
//! Every failure leaves the comparison list untouched and answers with
//! `{"error": {"reason": ..., "message": ...}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing/invalid session, bad token or missing capability (403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed item id (400)
    #[error("Invalid product: {0}")]
    InvalidItem(String),

    /// Comparison list is full (409)
    #[error("Maximum products reached ({max})")]
    CapacityExceeded { max: usize },

    /// Persistence or other internal failure (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Machine-readable reason reported to clients
    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::InvalidItem(_) => "invalid_item",
            ApiError::CapacityExceeded { .. } => "capacity_exceeded",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidItem(_) => StatusCode::BAD_REQUEST,
            ApiError::CapacityExceeded { .. } => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable text; internal detail stays in the log
    fn message(&self) -> String {
        match self {
            ApiError::Unauthorized(_) => "Unauthorized access.".to_string(),
            ApiError::InvalidItem(_) => "Invalid product".to_string(),
            ApiError::CapacityExceeded { max } => {
                format!("Maximum products reached ({} max)", max)
            }
            ApiError::Internal(_) => "Error processing comparison request.".to_string(),
        }
    }
}

impl From<compare_common::Error> for ApiError {
    fn from(err: compare_common::Error) -> Self {
        use compare_common::Error;

        match err {
            Error::InvalidInput(msg) => ApiError::InvalidItem(msg),
            Error::CapacityExceeded { max } => ApiError::CapacityExceeded { max },
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            other if other.is_persistence() => {
                error!("Persistence failure: {}", other);
                ApiError::Internal(other.to_string())
            }
            other => {
                warn!("Request failed: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "reason": self.reason(),
                "message": self.message(),
            }
        }));

        (self.status(), body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
