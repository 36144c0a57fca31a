//! API error types and handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vigil_core::{allowed_targets, IncidentState, RegistryError};

/// API error type.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (validation error, invalid input).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rejected lifecycle transition. Carries the allowed targets so
    /// callers can render a state diagram hint.
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: IncidentState,
        to: IncidentState,
        allowed: Vec<IncidentState>,
    },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidTransition { .. } => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InvalidTransition { .. } => "INVALID_TRANSITION",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = match &self {
            ApiError::InvalidTransition { from, to, allowed } => Some(serde_json::json!({
                "from": from,
                "to": to,
                "allowed": allowed,
            })),
            _ => None,
        };
        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Validation(msg) => ApiError::BadRequest(msg),
            RegistryError::NotFound(id) => ApiError::NotFound(format!("incident {}", id)),
            RegistryError::PlanNotFound(id) => {
                ApiError::NotFound(format!("recovery plan {}", id))
            }
            RegistryError::InvalidTransition(e) => {
                let vigil_core::LifecycleError::InvalidTransition { from, to } = e;
                ApiError::InvalidTransition {
                    from,
                    to,
                    allowed: allowed_targets(from),
                }
            }
            err => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
