use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use shared_models::resource::{appointment_end, ReservedResources};

use crate::models::{Appointment, AppointmentError, AppointmentStatus, CancelledBy};

/// A change requested of an appointment's lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// `Requested -> Scheduled` with whatever was reserved.
    Schedule { resources: ReservedResources },
    /// `Requested -> Denied`.
    Deny { reason: String },
    /// `Requested | Scheduled -> Cancelled`. Already cancelled is a no-op.
    Cancel {
        by: CancelledBy,
        reason: Option<String>,
    },
    /// `Requested | Scheduled -> Requested` at a new instant.
    Reschedule { start: DateTime<Utc> },
    /// Reservation made elsewhere finished: `Requested | Scheduled -> Scheduled`.
    ConfirmReservation { resources: ReservedResources },
    /// Reservation for the window at `start` failed: `Scheduled -> Requested`. A failure
    /// for any other window is stale and ignored.
    RevertSchedule { start: DateTime<Utc> },
}

impl Transition {
    pub fn target(&self) -> AppointmentStatus {
        match self {
            Transition::Schedule { .. } | Transition::ConfirmReservation { .. } => {
                AppointmentStatus::Scheduled
            }
            Transition::Deny { .. } => AppointmentStatus::Denied,
            Transition::Cancel { .. } => AppointmentStatus::Cancelled,
            Transition::Reschedule { .. } | Transition::RevertSchedule { .. } => {
                AppointmentStatus::Requested
            }
        }
    }

    /// Instant whose doctor slot the appointment must hold after the transition, if the
    /// transition has to re-check it.
    pub fn claimed_instant(&self, appointment: &Appointment) -> Option<DateTime<Utc>> {
        match self {
            Transition::Reschedule { start } => Some(*start),
            Transition::Schedule { .. } | Transition::ConfirmReservation { .. } => {
                Some(appointment.appointment_date_time)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedTransition {
    pub appointment: Appointment,
    /// False when the transition was an idempotent no-op.
    pub changed: bool,
}

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if !self.get_valid_transitions(current_status).contains(new_status) {
            warn!(
                "Invalid status transition attempted: {} -> {}",
                current_status, new_status
            );
            return Err(AppointmentError::InvalidStatusTransition {
                from: *current_status,
                to: *new_status,
            });
        }
        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Requested => vec![
                AppointmentStatus::Scheduled,
                AppointmentStatus::Denied,
                AppointmentStatus::Cancelled,
                AppointmentStatus::Requested,
            ],
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Cancelled,
                AppointmentStatus::Requested,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Denied => vec![],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Applies `transition` to `appointment` in place.
    ///
    /// Returns `Ok(false)` for idempotent no-ops (cancelling a cancelled appointment,
    /// reverting one that is already requested). Reservations are only attached when they
    /// were made for the appointment's current instant. Doctor-slot checks are the caller's
    /// job.
    pub fn apply(
        &self,
        appointment: &mut Appointment,
        transition: &Transition,
        now: DateTime<Utc>,
    ) -> Result<bool, AppointmentError> {
        let current = appointment.status;

        match transition {
            Transition::Schedule { resources } => {
                self.validate_status_transition(&current, &AppointmentStatus::Scheduled)?;
                if current != AppointmentStatus::Requested {
                    return Err(AppointmentError::InvalidStatusTransition {
                        from: current,
                        to: AppointmentStatus::Scheduled,
                    });
                }
                ensure_current_window(appointment, resources)?;
                appointment.status = AppointmentStatus::Scheduled;
                appointment.attach_resources(resources);
            }
            Transition::Deny { reason } => {
                let reason = reason.trim();
                if reason.is_empty() {
                    return Err(AppointmentError::ValidationError(
                        "A reason is required to reject an appointment".to_string(),
                    ));
                }
                self.validate_status_transition(&current, &AppointmentStatus::Denied)?;
                appointment.status = AppointmentStatus::Denied;
                appointment.denial_reason = Some(reason.to_string());
            }
            Transition::Cancel { by, reason } => {
                if current == AppointmentStatus::Cancelled {
                    debug!("Appointment {} already cancelled", appointment.id);
                    return Ok(false);
                }
                self.validate_status_transition(&current, &AppointmentStatus::Cancelled)?;
                appointment.status = AppointmentStatus::Cancelled;
                appointment.cancelled_by = Some(*by);
                appointment.cancellation_reason = reason.clone();
            }
            Transition::Reschedule { start } => {
                self.validate_status_transition(&current, &AppointmentStatus::Requested)?;
                appointment.status = AppointmentStatus::Requested;
                appointment.appointment_date_time = *start;
                appointment.end_time = appointment_end(*start);
                appointment.clear_resources();
            }
            Transition::ConfirmReservation { resources } => match current {
                AppointmentStatus::Requested => {
                    ensure_current_window(appointment, resources)?;
                    appointment.status = AppointmentStatus::Scheduled;
                    appointment.attach_resources(resources);
                }
                AppointmentStatus::Scheduled => {
                    ensure_current_window(appointment, resources)?;
                    appointment.attach_resources(resources);
                }
                terminal => {
                    return Err(AppointmentError::InvalidStatusTransition {
                        from: terminal,
                        to: AppointmentStatus::Scheduled,
                    })
                }
            },
            Transition::RevertSchedule { start } if *start != appointment.appointment_date_time => {
                debug!(
                    "Ignoring failed reservation for {} on appointment {} now at {}",
                    start, appointment.id, appointment.appointment_date_time
                );
                return Ok(false);
            }
            Transition::RevertSchedule { .. } => match current {
                AppointmentStatus::Scheduled => {
                    appointment.status = AppointmentStatus::Requested;
                    appointment.clear_resources();
                }
                AppointmentStatus::Requested => return Ok(false),
                terminal => {
                    return Err(AppointmentError::InvalidStatusTransition {
                        from: terminal,
                        to: AppointmentStatus::Requested,
                    })
                }
            },
        }

        appointment.updated_at = now;
        debug!(
            "Appointment {} moved {} -> {}",
            appointment.id, current, appointment.status
        );
        Ok(true)
    }
}

fn ensure_current_window(
    appointment: &Appointment,
    resources: &ReservedResources,
) -> Result<(), AppointmentError> {
    match resources.start {
        Some(reserved_for) if reserved_for != appointment.appointment_date_time => {
            warn!(
                "Reservation for {} arrived for appointment {} now at {}",
                reserved_for, appointment.id, appointment.appointment_date_time
            );
            Err(AppointmentError::StaleReservation {
                reserved_for,
                scheduled_for: appointment.appointment_date_time,
            })
        }
        _ => Ok(()),
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
