use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error codes returned to API callers.
pub mod codes {
    pub const APPOINTMENT_NOT_FOUND: &str = "appointment.not.found";
    pub const APPOINTMENT_DOCTOR_UNAVAILABLE: &str = "appointment.doctor.unavailable";
    pub const APPOINTMENT_INVALID_STATE: &str = "appointment.invalid.state";
    pub const APPOINTMENT_VALIDATION_FAILED: &str = "appointment.validation.failed";
    pub const APPOINTMENT_RESERVATION_STALE: &str = "appointment.reservation.stale";
    pub const DOCTOR_NOT_FOUND: &str = "doctor.not.found";
    pub const PATIENT_NOT_FOUND: &str = "patient.not.found";
    pub const RESOURCE_NOT_FOUND: &str = "resource.or.appointment.not-found";
    pub const RESOURCE_UNAVAILABLE: &str = "resource.unavailable";
    pub const RESOURCE_VALIDATION_FAILED: &str = "resource.validation.failed";
    pub const UNDECODABLE_REQUEST: &str = "undecodable.request";
    pub const INTERNAL_SERVER_ERROR: &str = "internal.server.error";
}

const GENERIC_DETAIL: &str = "Unexpected error on server";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not Found: {detail}")]
    NotFound { code: &'static str, detail: String },

    #[error("Conflict: {detail}")]
    Conflict { code: &'static str, detail: String },

    #[error("Validation error: {detail}")]
    ValidationError { code: &'static str, detail: String },

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

/// Wire shape of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub title: String,
    pub detail: String,
    pub status: u16,
}

impl AppError {
    pub fn not_found(code: &'static str, detail: impl Into<String>) -> Self {
        AppError::NotFound { code, detail: detail.into() }
    }

    pub fn conflict(code: &'static str, detail: impl Into<String>) -> Self {
        AppError::Conflict { code, detail: detail.into() }
    }

    pub fn validation(code: &'static str, detail: impl Into<String>) -> Self {
        AppError::ValidationError { code, detail: detail.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::ValidationError { .. } | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ExternalService(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::ValidationError { code, .. } => code,
            AppError::BadRequest(_) => codes::UNDECODABLE_REQUEST,
            AppError::ExternalService(_) | AppError::Internal(_) => codes::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body sent to the caller. Downstream and internal detail never leaves the process.
    pub fn body(&self) -> ErrorBody {
        let status = self.status();
        let detail = match self {
            AppError::NotFound { detail, .. }
            | AppError::Conflict { detail, .. }
            | AppError::ValidationError { detail, .. } => detail.clone(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::ExternalService(_) | AppError::Internal(_) => GENERIC_DETAIL.to_string(),
        };

        ErrorBody {
            code: self.code().to_string(),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            detail,
            status: status.as_u16(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Error: {}: {}", status, self);
        } else {
            tracing::debug!("Rejected request: {}: {}", status, self);
        }

        (status, Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
