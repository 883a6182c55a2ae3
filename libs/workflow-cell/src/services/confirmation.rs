use async_trait::async_trait;
use reqwest::Method;

use appointment_cell::AppointmentBookingService;
use shared_client::{RestClient, RestError};
use shared_config::AppConfig;
use shared_models::resource::ReservedResources;

use crate::error::WorkflowError;

/// Tells the appointment side that resources were reserved for it.
///
/// Implementations return `ConfirmationRejected` only when the appointment side definitely
/// refused; anything that might have been applied is `ConfirmationFailed`.
#[async_trait]
pub trait AppointmentConfirmation: Send + Sync {
    async fn confirm(&self, reserved: &ReservedResources) -> Result<(), WorkflowError>;
}

/// `PUT /appointments/{id}/resources` on the appointment service.
pub struct HttpAppointmentConfirmation {
    rest: RestClient,
}

impl HttpAppointmentConfirmation {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, WorkflowError> {
        let rest = RestClient::from_config(config.appointment_service_url.clone(), config)?;
        Ok(Self::new(rest))
    }
}

#[async_trait]
impl AppointmentConfirmation for HttpAppointmentConfirmation {
    async fn confirm(&self, reserved: &ReservedResources) -> Result<(), WorkflowError> {
        let body = serde_json::to_value(reserved)?;
        self.rest
            .execute(
                Method::PUT,
                &format!("/appointments/{}/resources", reserved.appointment_id),
                Some(body),
            )
            .await
            .map(|_| ())
            .map_err(|e| match e {
                RestError::Status { status, body } if matches!(status, 400 | 404 | 409 | 422) => {
                    WorkflowError::ConfirmationRejected(format!("{}: {}", status, body))
                }
                other => WorkflowError::ConfirmationFailed(other.to_string()),
            })
    }
}

#[async_trait]
impl AppointmentConfirmation for AppointmentBookingService {
    async fn confirm(&self, reserved: &ReservedResources) -> Result<(), WorkflowError> {
        self.confirm_reservation(reserved.appointment_id, reserved.clone())
            .await
            .map(|_| ())
            .map_err(|e| {
                if e.is_transient() {
                    WorkflowError::ConfirmationFailed(e.to_string())
                } else {
                    WorkflowError::ConfirmationRejected(e.to_string())
                }
            })
    }
}
