use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError};
use crate::services::availability;
use crate::services::lifecycle::{AppliedTransition, AppointmentLifecycleService, Transition};

/// Appointment persistence.
///
/// `create` and `apply` are atomic with respect to the doctor slot: the availability check
/// and the write happen under one lock, so a doctor never ends up with two active
/// appointments at the same instant.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn create(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError>;

    async fn is_doctor_free(
        &self,
        doctor_id: Uuid,
        at: DateTime<Utc>,
        excluding: Option<Uuid>,
    ) -> Result<bool, AppointmentError>;

    async fn apply(
        &self,
        id: Uuid,
        transition: Transition,
    ) -> Result<AppliedTransition, AppointmentError>;

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError>;

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError>;
}

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    lifecycle: AppointmentLifecycleService,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn list_where<F>(&self, predicate: F) -> Vec<Appointment>
    where
        F: Fn(&Appointment) -> bool,
    {
        let mut matching: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|a| predicate(a))
            .cloned()
            .collect();
        matching.sort_by_key(|a| (a.appointment_date_time, a.created_at));
        matching
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn create(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;

        if let Some(existing) = availability::conflicting_appointment(
            appointments.values(),
            appointment.doctor_id,
            appointment.appointment_date_time,
            None,
        ) {
            warn!(
                "Doctor {} already holds appointment {} at {}",
                appointment.doctor_id, existing.id, appointment.appointment_date_time
            );
            return Err(AppointmentError::DoctorNotAvailable {
                doctor_id: appointment.doctor_id,
                at: appointment.appointment_date_time,
            });
        }

        appointments.insert(appointment.id, appointment.clone());
        debug!("Stored appointment {}", appointment.id);
        Ok(appointment)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn is_doctor_free(
        &self,
        doctor_id: Uuid,
        at: DateTime<Utc>,
        excluding: Option<Uuid>,
    ) -> Result<bool, AppointmentError> {
        Ok(availability::is_doctor_free(
            self.appointments.read().await.values(),
            doctor_id,
            at,
            excluding,
        ))
    }

    async fn apply(
        &self,
        id: Uuid,
        transition: Transition,
    ) -> Result<AppliedTransition, AppointmentError> {
        let mut appointments = self.appointments.write().await;

        let mut appointment = appointments
            .get(&id)
            .cloned()
            .ok_or(AppointmentError::NotFound(id))?;

        if let Some(at) = transition.claimed_instant(&appointment) {
            if !appointment.status.is_terminal()
                && !availability::is_doctor_free(
                    appointments.values(),
                    appointment.doctor_id,
                    at,
                    Some(id),
                )
            {
                return Err(AppointmentError::DoctorNotAvailable {
                    doctor_id: appointment.doctor_id,
                    at,
                });
            }
        }

        let changed = self.lifecycle.apply(&mut appointment, &transition, Utc::now())?;
        if changed {
            appointments.insert(id, appointment.clone());
        }

        Ok(AppliedTransition {
            appointment,
            changed,
        })
    }

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.list_where(|a| a.doctor_id == doctor_id).await)
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.list_where(|a| a.patient_id == patient_id).await)
    }
}
