use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::{codes, AppError};
use shared_models::resource::ResourceType;

// Variants carry a caller-facing detail so failures reported by a remote resource
// service map onto the same variants as local ones.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Resource service error: {0}")]
    ExternalServiceError(String),

    #[error("Resource store error: {0}")]
    StoreError(String),
}

impl ResourceError {
    pub fn resource_not_found(resource_id: Uuid) -> Self {
        ResourceError::NotFound(format!("Resource {} not found", resource_id))
    }

    pub fn unavailable(resource_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        ResourceError::Unavailable(format!(
            "Resource {} is already reserved between {} and {}",
            resource_id, start, end
        ))
    }

    pub fn invalid_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        ResourceError::ValidationError(format!(
            "Reservation end {} must be after start {}",
            end, start
        ))
    }

    pub fn type_mismatch(resource_id: Uuid, expected: ResourceType, actual: ResourceType) -> Self {
        ResourceError::ValidationError(format!(
            "Resource {} is {}, expected {}",
            resource_id, actual, expected
        ))
    }

    /// Failures worth retrying; everything else is a property of the request itself.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ResourceError::ExternalServiceError(_) | ResourceError::StoreError(_)
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            ResourceError::NotFound(_) => codes::RESOURCE_NOT_FOUND,
            ResourceError::Unavailable(_) => codes::RESOURCE_UNAVAILABLE,
            ResourceError::ValidationError(_) => codes::RESOURCE_VALIDATION_FAILED,
            ResourceError::ExternalServiceError(_) | ResourceError::StoreError(_) => {
                codes::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ResourceError> for AppError {
    fn from(e: ResourceError) -> Self {
        let code = e.code();
        match e {
            ResourceError::NotFound(detail) => AppError::not_found(code, detail),
            ResourceError::Unavailable(detail) => AppError::conflict(code, detail),
            ResourceError::ValidationError(detail) => AppError::validation(code, detail),
            ResourceError::ExternalServiceError(msg) => AppError::ExternalService(msg),
            ResourceError::StoreError(msg) => AppError::Internal(msg),
        }
    }
}
