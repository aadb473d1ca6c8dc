//! HTTP error mapping for facegate-node
//!
//! Two kinds of non-200 responses leave the node:
//! - requirement rejections (400/401) carry a plain-text reason for the
//!   caller;
//! - faults (storage, recognition pool, broken stored data) become a
//!   generic 500 JSON body and are logged, never explained to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use facegate_common::Outcome;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Terminal response produced by a failed requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: StatusCode,
    pub message: &'static str,
}

impl Rejection {
    pub fn bad_request(message: &'static str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }

    pub fn unauthorized(message: &'static str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message,
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request failed a precondition (400/401)
    #[error("Rejected: {0}")]
    Rejected(Rejection),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// facegate-common fault
    #[error("Common error: {0}")]
    Common(#[from] facegate_common::Error),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        ApiError::Rejected(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (error_code, detail) = match self {
            ApiError::Rejected(rejection) => {
                return (rejection.status, rejection.message).into_response();
            }
            ApiError::Internal(msg) => ("INTERNAL_ERROR", msg),
            ApiError::Common(ref err) => ("COMMON_ERROR", err.to_string()),
        };

        error!("Request failed with {}: {}", error_code, detail);

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": "Internal server error",
            }
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Serialize a service outcome as a 200 JSON response
///
/// Business failures are still 200; only the body's `success` flag differs.
pub fn outcome_response<T: Serialize>(outcome: &Outcome<T>) -> ApiResult<Response> {
    let body = outcome
        .to_wire()
        .map_err(|e| ApiError::Internal(format!("Failed to serialize outcome: {}", e)))?;
    Ok(Json(body).into_response())
}
