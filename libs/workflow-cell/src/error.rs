use thiserror::Error;

use resource_cell::ResourceError;
use shared_client::RestError;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Workflow engine request failed: {0}")]
    EngineError(#[from] RestError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidVariables(String),

    #[error("Failed to reserve resources: {0}")]
    ReservationFailed(#[from] ResourceError),

    /// The appointment side answered and refused the reservation.
    #[error("Reservation refused by the appointment service: {0}")]
    ConfirmationRejected(String),

    /// No definite answer; the confirmation may or may not have been applied.
    #[error("Failed to confirm reservation: {0}")]
    ConfirmationFailed(String),
}
