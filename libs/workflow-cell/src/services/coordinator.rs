use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument};
use uuid::Uuid;

use appointment_cell::services::coordinator::{ensure_doctor_free, load_for_decision, reject};
use appointment_cell::{
    Appointment, AppointmentDecision, AppointmentError, AppointmentStatus, AppointmentStore,
    BookingCoordinator,
};
use shared_config::BookingStrategy;

use crate::models::{ReserveResourcesTask, StartProcessRequest};
use crate::services::engine::WorkflowEngine;

/// Hands accepted appointments to a process instance in the workflow engine. The
/// appointment stays `Requested` until the reservation worker confirms it.
pub struct WorkflowCoordinator {
    store: Arc<dyn AppointmentStore>,
    engine: Arc<dyn WorkflowEngine>,
    process_key: String,
}

impl WorkflowCoordinator {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        engine: Arc<dyn WorkflowEngine>,
        process_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            engine,
            process_key: process_key.into(),
        }
    }
}

#[async_trait]
impl BookingCoordinator for WorkflowCoordinator {
    fn strategy(&self) -> BookingStrategy {
        BookingStrategy::Workflow
    }

    #[instrument(skip(self, decision), fields(strategy = "workflow"))]
    async fn decide(
        &self,
        appointment_id: Uuid,
        decision: AppointmentDecision,
    ) -> Result<Appointment, AppointmentError> {
        let resources = match decision {
            AppointmentDecision::Reject { reason } => {
                return reject(self.store.as_ref(), appointment_id, reason).await;
            }
            AppointmentDecision::Accept { resources } => resources,
        };

        let appointment =
            load_for_decision(self.store.as_ref(), appointment_id, AppointmentStatus::Scheduled)
                .await?;
        ensure_doctor_free(self.store.as_ref(), &appointment).await?;

        let task = ReserveResourcesTask {
            appointment_id,
            appointment_date_time: appointment.appointment_date_time,
            facility_id: resources.facility_id,
            equipment_id: resources.equipment_id,
            medicine_id: resources.medicine_id,
        };
        let request = StartProcessRequest {
            business_key: appointment_id.to_string(),
            variables: task.to_variables(),
        };

        let instance = self
            .engine
            .start_process(&self.process_key, &request)
            .await
            .map_err(|e| {
                error!(
                    "Starting {} for appointment {} failed: {}",
                    self.process_key, appointment_id, e
                );
                AppointmentError::ExternalServiceError(e.to_string())
            })?;

        info!(
            "Appointment {} handed to process instance {}",
            appointment_id, instance.id
        );
        Ok(appointment)
    }
}
