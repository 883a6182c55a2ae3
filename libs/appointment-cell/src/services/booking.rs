use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use resource_cell::ResourceReservationClient;
use shared_config::BookingStrategy;
use shared_models::resource::{ReleaseScope, ReservedResources};

use crate::models::{
    Appointment, AppointmentDecision, AppointmentError, CancelAppointmentRequest,
    CreateAppointmentRequest, DecisionRequest, RescheduleAppointmentRequest,
};
use crate::services::coordinator::BookingCoordinator;
use crate::services::directory::ParticipantDirectory;
use crate::services::lifecycle::Transition;
use crate::store::AppointmentStore;

pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    coordinator: Arc<dyn BookingCoordinator>,
    resources: Arc<dyn ResourceReservationClient>,
    directory: Arc<dyn ParticipantDirectory>,
}

impl AppointmentBookingService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        coordinator: Arc<dyn BookingCoordinator>,
        resources: Arc<dyn ResourceReservationClient>,
        directory: Arc<dyn ParticipantDirectory>,
    ) -> Self {
        Self {
            store,
            coordinator,
            resources,
            directory,
        }
    }

    pub fn strategy(&self) -> BookingStrategy {
        self.coordinator.strategy()
    }

    // ==============================================================================
    // CREATION AND QUERIES
    // ==============================================================================

    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id))]
    pub async fn request_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        if request.appointment_type.trim().is_empty() {
            return Err(AppointmentError::ValidationError(
                "Appointment type must not be empty".to_string(),
            ));
        }

        self.directory.ensure_doctor(request.doctor_id).await?;
        self.directory.ensure_patient(request.patient_id).await?;

        let appointment = self
            .store
            .create(Appointment::requested(request, Utc::now()))
            .await?;

        info!(
            "Appointment {} requested with doctor {} at {}",
            appointment.id, appointment.doctor_id, appointment.appointment_date_time
        );
        Ok(appointment)
    }

    pub async fn get_appointment(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .get(id)
            .await?
            .ok_or(AppointmentError::NotFound(id))
    }

    pub async fn list_doctor_appointments(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list_for_doctor(doctor_id).await
    }

    pub async fn list_patient_appointments(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list_for_patient(patient_id).await
    }

    // ==============================================================================
    // LIFECYCLE OPERATIONS
    // ==============================================================================

    #[instrument(skip(self, request))]
    pub async fn decide(
        &self,
        id: Uuid,
        request: DecisionRequest,
    ) -> Result<Appointment, AppointmentError> {
        let decision = AppointmentDecision::try_from(request)?;
        self.coordinator.decide(id, decision).await
    }

    /// Moves the appointment back to requested at a new instant. Whatever was reserved for
    /// the old instant is released; the next accept reserves afresh.
    #[instrument(skip(self, request))]
    pub async fn reschedule(
        &self,
        id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let previous_start = self.get_appointment(id).await?.appointment_date_time;
        let applied = self
            .store
            .apply(
                id,
                Transition::Reschedule {
                    start: request.new_appointment_date_time,
                },
            )
            .await?;

        info!(
            "Appointment {} moved to {}, awaiting a new decision",
            id, request.new_appointment_date_time
        );
        self.release_best_effort(id, &ReleaseScope::window(previous_start))
            .await;
        Ok(applied.appointment)
    }

    /// Cancels the appointment and releases whatever it holds. Release failures are logged
    /// only; the cancellation stands.
    #[instrument(skip(self, request))]
    pub async fn cancel(
        &self,
        id: Uuid,
        request: CancelAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let applied = self
            .store
            .apply(
                id,
                Transition::Cancel {
                    by: request.by,
                    reason: request.reason,
                },
            )
            .await?;

        if applied.changed {
            info!("Appointment {} cancelled by {:?}", id, applied.appointment.cancelled_by);
            self.release_best_effort(id, &ReleaseScope::all()).await;
        }

        Ok(applied.appointment)
    }

    /// Records a reservation performed outside the decision request (event consumer or
    /// workflow worker). Reservations that arrive for an appointment that is no longer
    /// active, or that was moved to another instant, are released. Only the rows the
    /// reservation describes are touched.
    #[instrument(skip(self, reserved))]
    pub async fn confirm_reservation(
        &self,
        id: Uuid,
        reserved: ReservedResources,
    ) -> Result<Appointment, AppointmentError> {
        if reserved.appointment_id != id {
            return Err(AppointmentError::ValidationError(format!(
                "Reservation belongs to appointment {}, not {}",
                reserved.appointment_id, id
            )));
        }

        let scope = ReleaseScope::of(&reserved);
        let holds_resources = !reserved.is_empty();
        match self
            .store
            .apply(id, Transition::ConfirmReservation { resources: reserved })
            .await
        {
            Ok(applied) => {
                info!("Reservation confirmed for appointment {}", id);
                Ok(applied.appointment)
            }
            Err(e @ AppointmentError::InvalidStatusTransition { .. })
            | Err(e @ AppointmentError::DoctorNotAvailable { .. })
            | Err(e @ AppointmentError::StaleReservation { .. }) => {
                warn!("Late reservation for appointment {}: {}", id, e);
                if holds_resources {
                    self.release_best_effort(id, &scope).await;
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Compensates an optimistic schedule whose reservation for the window at `start`
    /// failed downstream. Failures for a window the appointment has since left change
    /// nothing.
    #[instrument(skip(self))]
    pub async fn revert_schedule(
        &self,
        id: Uuid,
        start: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let applied = self
            .store
            .apply(id, Transition::RevertSchedule { start })
            .await?;
        if applied.changed {
            warn!("Appointment {} reverted to requested after failed reservation", id);
        }
        Ok(applied.appointment)
    }

    pub async fn is_doctor_free(
        &self,
        doctor_id: Uuid,
        at: DateTime<Utc>,
        excluding: Option<Uuid>,
    ) -> Result<bool, AppointmentError> {
        self.store.is_doctor_free(doctor_id, at, excluding).await
    }

    async fn release_best_effort(&self, id: Uuid, scope: &ReleaseScope) {
        if let Err(e) = self.resources.release(id, scope).await {
            error!("Releasing reservations of appointment {} failed: {}", id, e);
        }
    }
}
