use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::Appointment;

/// A doctor is free at `at` when no active appointment of theirs starts at exactly that
/// instant. `excluding` skips the appointment being moved or decided.
pub fn is_doctor_free<'a, I>(
    appointments: I,
    doctor_id: Uuid,
    at: DateTime<Utc>,
    excluding: Option<Uuid>,
) -> bool
where
    I: IntoIterator<Item = &'a Appointment>,
{
    conflicting_appointment(appointments, doctor_id, at, excluding).is_none()
}

pub fn conflicting_appointment<'a, I>(
    appointments: I,
    doctor_id: Uuid,
    at: DateTime<Utc>,
    excluding: Option<Uuid>,
) -> Option<&'a Appointment>
where
    I: IntoIterator<Item = &'a Appointment>,
{
    appointments.into_iter().find(|appointment| {
        appointment.doctor_id == doctor_id
            && appointment.appointment_date_time == at
            && appointment.status.holds_doctor_slot()
            && Some(appointment.id) != excluding
    })
}
