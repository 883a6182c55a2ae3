use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_client::{RestClient, RestError};
use shared_config::AppConfig;

use crate::models::AppointmentError;

/// Confirms that the doctor and patient named on a request exist.
#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    async fn ensure_doctor(&self, doctor_id: Uuid) -> Result<(), AppointmentError>;

    async fn ensure_patient(&self, patient_id: Uuid) -> Result<(), AppointmentError>;
}

/// Used when no directory service is configured: every participant is accepted.
#[derive(Debug, Default, Clone, Copy)]
pub struct UncheckedDirectory;

#[async_trait]
impl ParticipantDirectory for UncheckedDirectory {
    async fn ensure_doctor(&self, _doctor_id: Uuid) -> Result<(), AppointmentError> {
        Ok(())
    }

    async fn ensure_patient(&self, _patient_id: Uuid) -> Result<(), AppointmentError> {
        Ok(())
    }
}

pub struct HttpParticipantDirectory {
    rest: RestClient,
}

impl HttpParticipantDirectory {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn from_config(base_url: &str, config: &AppConfig) -> Result<Self, AppointmentError> {
        let rest = RestClient::from_config(base_url, config)
            .map_err(|e| AppointmentError::ExternalServiceError(e.to_string()))?;
        Ok(Self::new(rest))
    }

    async fn lookup(&self, path: &str) -> Result<bool, AppointmentError> {
        match self.rest.execute(Method::GET, path, None).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(RestError::Status { status, body }) => {
                warn!("Directory lookup {} answered {}: {}", path, status, body);
                Err(AppointmentError::ExternalServiceError(format!(
                    "directory service returned {}",
                    status
                )))
            }
            Err(e) => Err(AppointmentError::ExternalServiceError(e.to_string())),
        }
    }
}

#[async_trait]
impl ParticipantDirectory for HttpParticipantDirectory {
    async fn ensure_doctor(&self, doctor_id: Uuid) -> Result<(), AppointmentError> {
        debug!("Looking up doctor {}", doctor_id);
        if self.lookup(&format!("/doctors/{}", doctor_id)).await? {
            Ok(())
        } else {
            Err(AppointmentError::DoctorNotFound(doctor_id))
        }
    }

    async fn ensure_patient(&self, patient_id: Uuid) -> Result<(), AppointmentError> {
        debug!("Looking up patient {}", patient_id);
        if self.lookup(&format!("/patients/{}", patient_id)).await? {
            Ok(())
        } else {
            Err(AppointmentError::PatientNotFound(patient_id))
        }
    }
}
