//! HTTP Error Mapping
//!
//! Maps application errors to status codes and a `{"error", "code"}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kairos_core::domain::DomainError;
use kairos_core::error::{AppError, NotFoundKind};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Error codes carried in the `code` field
pub mod code {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const JOB_NOT_FOUND: &str = "JOB_NOT_FOUND";
    pub const PROCESS_NOT_FOUND: &str = "PROCESS_NOT_FOUND";
    pub const PROCESS_INSTANCE_NOT_FOUND: &str = "PROCESS_INSTANCE_NOT_FOUND";
    pub const CONFLICT: &str = "CONFLICT";
    pub const UNSUPPORTED: &str = "UNSUPPORTED";
    pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
    pub const REPOSITORY_ERROR: &str = "REPOSITORY_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Wire form of an error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

/// Handler error: an AppError rendered as JSON
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError(AppError::Domain(err))
    }
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError(AppError::Validation(message.into()))
    }

    /// Status code and error code for the wrapped error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            AppError::Validation(_) | AppError::Serialization(_) => {
                (StatusCode::BAD_REQUEST, code::VALIDATION_ERROR)
            }
            AppError::Domain(DomainError::InvalidStateTransition { .. }) => {
                (StatusCode::CONFLICT, code::CONFLICT)
            }
            AppError::Domain(_) => (StatusCode::BAD_REQUEST, code::VALIDATION_ERROR),
            AppError::NotFound { kind, .. } => {
                let code = match kind {
                    NotFoundKind::Job => code::JOB_NOT_FOUND,
                    NotFoundKind::Process => code::PROCESS_NOT_FOUND,
                    NotFoundKind::ProcessInstance => code::PROCESS_INSTANCE_NOT_FOUND,
                };
                (StatusCode::NOT_FOUND, code)
            }
            AppError::InvalidState(_) => (StatusCode::CONFLICT, code::CONFLICT),
            AppError::Unsupported(_) => (StatusCode::NOT_IMPLEMENTED, code::UNSUPPORTED),
            AppError::Transport(_) => (StatusCode::BAD_GATEWAY, code::TRANSPORT_ERROR),
            AppError::Repository(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, code::REPOSITORY_ERROR)
            }
            AppError::Config(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, code::INTERNAL_ERROR)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(error = %self.0, code, "Request failed");
        }
        let body = ErrorBody {
            error: self.0.to_string(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
