use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use resource_cell::ResourceReservationClient;
use shared_config::BookingStrategy;
use shared_models::resource::{ReleaseScope, ReserveResourcesRequest, ReservedResources};

use crate::models::{Appointment, AppointmentDecision, AppointmentError, AppointmentStatus};
use crate::services::lifecycle::Transition;
use crate::store::AppointmentStore;

/// Carries a doctor's accept/reject decision through to resource reservation.
///
/// One implementation per booking strategy; the active one is picked at startup.
#[async_trait]
pub trait BookingCoordinator: Send + Sync {
    fn strategy(&self) -> BookingStrategy;

    async fn decide(
        &self,
        appointment_id: Uuid,
        decision: AppointmentDecision,
    ) -> Result<Appointment, AppointmentError>;
}

// ==============================================================================
// HELPERS SHARED BY ALL STRATEGIES
// ==============================================================================

/// Loads an appointment that is still awaiting a decision.
pub async fn load_for_decision(
    store: &dyn AppointmentStore,
    appointment_id: Uuid,
    target: AppointmentStatus,
) -> Result<Appointment, AppointmentError> {
    let appointment = store
        .get(appointment_id)
        .await?
        .ok_or(AppointmentError::NotFound(appointment_id))?;

    if appointment.status != AppointmentStatus::Requested {
        warn!(
            "Decision on appointment {} rejected, status is {}",
            appointment_id, appointment.status
        );
        return Err(AppointmentError::InvalidStatusTransition {
            from: appointment.status,
            to: target,
        });
    }

    Ok(appointment)
}

pub async fn ensure_doctor_free(
    store: &dyn AppointmentStore,
    appointment: &Appointment,
) -> Result<(), AppointmentError> {
    let free = store
        .is_doctor_free(
            appointment.doctor_id,
            appointment.appointment_date_time,
            Some(appointment.id),
        )
        .await?;

    if !free {
        return Err(AppointmentError::DoctorNotAvailable {
            doctor_id: appointment.doctor_id,
            at: appointment.appointment_date_time,
        });
    }
    Ok(())
}

/// Rejecting never touches resources, whatever the strategy.
pub async fn reject(
    store: &dyn AppointmentStore,
    appointment_id: Uuid,
    reason: String,
) -> Result<Appointment, AppointmentError> {
    load_for_decision(store, appointment_id, AppointmentStatus::Denied).await?;
    let applied = store
        .apply(appointment_id, Transition::Deny { reason })
        .await?;
    info!("Appointment {} denied", appointment_id);
    Ok(applied.appointment)
}

// ==============================================================================
// SYNCHRONOUS STRATEGY
// ==============================================================================

/// Reserves resources inline and only then marks the appointment scheduled.
pub struct SyncCoordinator {
    store: Arc<dyn AppointmentStore>,
    resources: Arc<dyn ResourceReservationClient>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        resources: Arc<dyn ResourceReservationClient>,
    ) -> Self {
        Self { store, resources }
    }

    async fn accept(
        &self,
        appointment: Appointment,
        request: ReserveResourcesRequest,
    ) -> Result<Appointment, AppointmentError> {
        let reserved = if request.is_empty() {
            ReservedResources::for_window(appointment.id, request.start)
        } else {
            self.resources.reserve(appointment.id, &request).await?
        };

        match self
            .store
            .apply(
                appointment.id,
                Transition::Schedule {
                    resources: reserved.clone(),
                },
            )
            .await
        {
            Ok(applied) => {
                info!("Appointment {} scheduled", appointment.id);
                Ok(applied.appointment)
            }
            Err(e) => {
                if !reserved.is_empty() {
                    self.release_unclaimed(&reserved).await;
                }
                Err(e)
            }
        }
    }

    /// Undoes this call's reservation after the schedule write lost. Rows the appointment
    /// now references were confirmed by a concurrent accept and stay.
    async fn release_unclaimed(&self, reserved: &ReservedResources) {
        let appointment_id = reserved.appointment_id;
        let current = match self.store.get(appointment_id).await {
            Ok(current) => current,
            Err(e) => {
                error!(
                    "Could not re-read appointment {} to release its reservations: {}",
                    appointment_id, e
                );
                return;
            }
        };

        let kept_by_winner = |resource_id: Uuid| {
            current.as_ref().is_some_and(|a| {
                a.status == AppointmentStatus::Scheduled
                    && Some(a.appointment_date_time) == reserved.start
                    && a.references_resource(resource_id)
            })
        };
        let resource_ids: Vec<Uuid> = reserved
            .resource_ids()
            .into_iter()
            .filter(|id| !kept_by_winner(*id))
            .collect();
        if resource_ids.is_empty() {
            info!(
                "Reservations of appointment {} belong to a concurrent schedule, keeping them",
                appointment_id
            );
            return;
        }

        let scope = ReleaseScope {
            start: reserved.start,
            resource_ids,
        };
        if let Err(release_error) = self.resources.release(appointment_id, &scope).await {
            error!(
                "Could not release reservations of appointment {}: {}",
                appointment_id, release_error
            );
        }
    }
}

#[async_trait]
impl BookingCoordinator for SyncCoordinator {
    fn strategy(&self) -> BookingStrategy {
        BookingStrategy::Sync
    }

    #[instrument(skip(self, decision), fields(strategy = "sync"))]
    async fn decide(
        &self,
        appointment_id: Uuid,
        decision: AppointmentDecision,
    ) -> Result<Appointment, AppointmentError> {
        match decision {
            AppointmentDecision::Reject { reason } => {
                reject(self.store.as_ref(), appointment_id, reason).await
            }
            AppointmentDecision::Accept { resources } => {
                let appointment = load_for_decision(
                    self.store.as_ref(),
                    appointment_id,
                    AppointmentStatus::Scheduled,
                )
                .await?;
                ensure_doctor_free(self.store.as_ref(), &appointment).await?;

                let request = resources.reservation_request(appointment.appointment_date_time);
                self.accept(appointment, request).await
            }
        }
    }
}
