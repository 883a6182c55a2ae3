use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument};
use uuid::Uuid;

use appointment_cell::services::coordinator::{ensure_doctor_free, load_for_decision, reject};
use appointment_cell::{
    Appointment, AppointmentDecision, AppointmentError, AppointmentStatus, AppointmentStore,
    BookingCoordinator, Transition,
};
use shared_config::BookingStrategy;
use shared_models::resource::ReservedResources;

use crate::models::{AppointmentScheduledEvent, EventEnvelope, APPOINTMENT_SCHEDULED};
use crate::services::bus::EventBus;

/// Schedules optimistically and leaves the reservation to the resource-side consumer.
pub struct EventCoordinator {
    store: Arc<dyn AppointmentStore>,
    bus: Arc<dyn EventBus>,
}

impl EventCoordinator {
    pub fn new(store: Arc<dyn AppointmentStore>, bus: Arc<dyn EventBus>) -> Self {
        Self { store, bus }
    }

    async fn publish_scheduled(&self, event: &AppointmentScheduledEvent) -> Result<(), String> {
        let envelope = EventEnvelope::new(APPOINTMENT_SCHEDULED, event.appointment_id, event)
            .map_err(|e| e.to_string())?;
        self.bus.publish(envelope).await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl BookingCoordinator for EventCoordinator {
    fn strategy(&self) -> BookingStrategy {
        BookingStrategy::Event
    }

    #[instrument(skip(self, decision), fields(strategy = "event"))]
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

        let scheduled = self
            .store
            .apply(
                appointment_id,
                Transition::Schedule {
                    resources: ReservedResources::for_window(
                        appointment_id,
                        appointment.appointment_date_time,
                    ),
                },
            )
            .await?
            .appointment;

        let event = AppointmentScheduledEvent {
            appointment_id,
            appointment_date_time: scheduled.appointment_date_time,
            facility_id: resources.facility_id,
            equipment_id: resources.equipment_id,
            medicine_id: resources.medicine_id,
        };

        if let Err(reason) = self.publish_scheduled(&event).await {
            error!(
                "Publishing {} for appointment {} failed: {}",
                APPOINTMENT_SCHEDULED, appointment_id, reason
            );
            let revert = Transition::RevertSchedule {
                start: scheduled.appointment_date_time,
            };
            if let Err(e) = self.store.apply(appointment_id, revert).await {
                error!("Reverting appointment {} failed: {}", appointment_id, e);
            }
            return Err(AppointmentError::ExternalServiceError(format!(
                "event publication failed: {}",
                reason
            )));
        }

        info!(
            "Appointment {} scheduled, reservation requested via {}",
            appointment_id, APPOINTMENT_SCHEDULED
        );
        Ok(scheduled)
    }
}
