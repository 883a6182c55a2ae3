use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use resource_cell::ResourceError;
use shared_models::error::{codes, AppError};
use shared_models::resource::{
    appointment_end, ReserveResourcesRequest, ReservedResource, ReservedResources,
};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub appointment_type: String,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub condition_id: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<CancelledBy>,
    pub denial_reason: Option<String>,
    pub facility: Option<ReservedResource>,
    pub equipment: Option<ReservedResource>,
    pub medicine: Option<ReservedResource>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn requested(request: CreateAppointmentRequest, now: DateTime<Utc>) -> Self {
        let start = request.appointment_date_time;
        Self {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            appointment_date_time: start,
            end_time: appointment_end(start),
            appointment_type: request.appointment_type.trim().to_string(),
            status: AppointmentStatus::Requested,
            reason: request.reason,
            condition_id: request.condition_id,
            cancellation_reason: None,
            cancelled_by: None,
            denial_reason: None,
            facility: None,
            equipment: None,
            medicine: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn attach_resources(&mut self, reserved: &ReservedResources) {
        self.facility = reserved.facility.clone();
        self.equipment = reserved.equipment.clone();
        self.medicine = reserved.medicine.clone();
    }

    pub fn clear_resources(&mut self) {
        self.facility = None;
        self.equipment = None;
        self.medicine = None;
    }

    pub fn has_resources(&self) -> bool {
        self.facility.is_some() || self.equipment.is_some() || self.medicine.is_some()
    }

    pub fn references_resource(&self, resource_id: Uuid) -> bool {
        [&self.facility, &self.equipment, &self.medicine]
            .into_iter()
            .flatten()
            .any(|resource| resource.id == resource_id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Requested,
    Scheduled,
    Denied,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Denied | AppointmentStatus::Cancelled)
    }

    /// Active appointments hold their doctor's time slot.
    pub fn holds_doctor_slot(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Requested => write!(f, "requested"),
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Denied => write!(f, "denied"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CancelledBy {
    Patient,
    Doctor,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub appointment_type: String,
    pub reason: Option<String>,
    pub condition_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub action: DecisionAction,
    pub reason: Option<String>,
    pub facility_id: Option<Uuid>,
    pub equipment_id: Option<Uuid>,
    pub medicine_id: Option<Uuid>,
}

/// Resources the decision-maker asks to attach on accept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceSelection {
    pub facility_id: Option<Uuid>,
    pub equipment_id: Option<Uuid>,
    pub medicine_id: Option<Uuid>,
}

impl ResourceSelection {
    pub fn reservation_request(&self, start: DateTime<Utc>) -> ReserveResourcesRequest {
        ReserveResourcesRequest {
            start,
            facility_id: self.facility_id,
            equipment_id: self.equipment_id,
            medicine_id: self.medicine_id,
        }
    }
}

/// A validated decision, as handed to a coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppointmentDecision {
    Accept { resources: ResourceSelection },
    Reject { reason: String },
}

impl TryFrom<DecisionRequest> for AppointmentDecision {
    type Error = AppointmentError;

    fn try_from(request: DecisionRequest) -> Result<Self, Self::Error> {
        match request.action {
            DecisionAction::Accept => Ok(AppointmentDecision::Accept {
                resources: ResourceSelection {
                    facility_id: request.facility_id,
                    equipment_id: request.equipment_id,
                    medicine_id: request.medicine_id,
                },
            }),
            DecisionAction::Reject => {
                let reason = request
                    .reason
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .ok_or_else(|| {
                        AppointmentError::ValidationError(
                            "A reason is required to reject an appointment".to_string(),
                        )
                    })?;
                Ok(AppointmentDecision::Reject { reason })
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleAppointmentRequest {
    pub new_appointment_date_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAppointmentRequest {
    pub by: CancelledBy,
    pub reason: Option<String>,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

/// Wire shape of an appointment: attached resources are rendered as lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponse {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub appointment_type: String,
    pub status: AppointmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<CancelledBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denial_reason: Option<String>,
    pub facilities: Vec<ReservedResource>,
    pub equipment: Vec<ReservedResource>,
    pub medicine: Vec<ReservedResource>,
}

impl From<Appointment> for AppointmentResponse {
    fn from(appointment: Appointment) -> Self {
        Self {
            id: appointment.id,
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            appointment_date_time: appointment.appointment_date_time,
            end_time: appointment.end_time,
            appointment_type: appointment.appointment_type,
            status: appointment.status,
            reason: appointment.reason,
            condition_id: appointment.condition_id,
            cancellation_reason: appointment.cancellation_reason,
            cancelled_by: appointment.cancelled_by,
            denial_reason: appointment.denial_reason,
            facilities: appointment.facility.into_iter().collect(),
            equipment: appointment.equipment.into_iter().collect(),
            medicine: appointment.medicine.into_iter().collect(),
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment {0} not found")]
    NotFound(Uuid),

    #[error("Doctor {doctor_id} already has an appointment at {at}")]
    DoctorNotAvailable { doctor_id: Uuid, at: DateTime<Utc> },

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Reservation for {reserved_for} does not match appointment time {scheduled_for}")]
    StaleReservation {
        reserved_for: DateTime<Utc>,
        scheduled_for: DateTime<Utc>,
    },

    #[error("Doctor {0} not found")]
    DoctorNotFound(Uuid),

    #[error("Patient {0} not found")]
    PatientNotFound(Uuid),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AppointmentError {
    /// Failures worth redelivering: the collaborator may answer differently next time.
    pub fn is_transient(&self) -> bool {
        match self {
            AppointmentError::ExternalServiceError(_) | AppointmentError::DatabaseError(_) => true,
            AppointmentError::Resource(inner) => inner.is_transient(),
            _ => false,
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::NotFound(_) => {
                AppError::not_found(codes::APPOINTMENT_NOT_FOUND, e.to_string())
            }
            AppointmentError::DoctorNotAvailable { .. } => {
                AppError::conflict(codes::APPOINTMENT_DOCTOR_UNAVAILABLE, e.to_string())
            }
            AppointmentError::InvalidStatusTransition { .. } => {
                AppError::conflict(codes::APPOINTMENT_INVALID_STATE, e.to_string())
            }
            AppointmentError::ValidationError(msg) => {
                AppError::validation(codes::APPOINTMENT_VALIDATION_FAILED, msg)
            }
            AppointmentError::StaleReservation { .. } => {
                AppError::conflict(codes::APPOINTMENT_RESERVATION_STALE, e.to_string())
            }
            AppointmentError::DoctorNotFound(_) => {
                AppError::not_found(codes::DOCTOR_NOT_FOUND, e.to_string())
            }
            AppointmentError::PatientNotFound(_) => {
                AppError::not_found(codes::PATIENT_NOT_FOUND, e.to_string())
            }
            AppointmentError::Resource(inner) => AppError::from(inner),
            AppointmentError::ExternalServiceError(msg) => AppError::ExternalService(msg),
            AppointmentError::DatabaseError(msg) => AppError::Internal(msg),
        }
    }
}
