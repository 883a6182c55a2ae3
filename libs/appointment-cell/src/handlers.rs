use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::resource::ReservedResources;
use shared_utils::extractor::{ApiJson, ApiPath};

use crate::models::{
    AppointmentResponse, CancelAppointmentRequest, CreateAppointmentRequest, DecisionRequest,
    RescheduleAppointmentRequest,
};
use crate::services::booking::AppointmentBookingService;

// ==============================================================================
// APPOINTMENT LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    ApiJson(request): ApiJson<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<AppointmentResponse>), AppError> {
    let appointment = service.request_appointment(request).await?;
    Ok((StatusCode::CREATED, Json(appointment.into())))
}

#[axum::debug_handler]
pub async fn decide_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    ApiPath(appointment_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<DecisionRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let appointment = service.decide(appointment_id, request).await?;
    Ok(Json(appointment.into()))
}

pub async fn reschedule_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    ApiPath(appointment_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<RescheduleAppointmentRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let appointment = service.reschedule(appointment_id, request).await?;
    Ok(Json(appointment.into()))
}

pub async fn cancel_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    ApiPath(appointment_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<CancelAppointmentRequest>,
) -> Result<StatusCode, AppError> {
    service.cancel(appointment_id, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Called by the reservation worker once resources are held for the appointment.
pub async fn confirm_resources(
    State(service): State<Arc<AppointmentBookingService>>,
    ApiPath(appointment_id): ApiPath<Uuid>,
    ApiJson(reserved): ApiJson<ReservedResources>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let appointment = service.confirm_reservation(appointment_id, reserved).await?;
    Ok(Json(appointment.into()))
}

// ==============================================================================
// QUERY HANDLERS
// ==============================================================================

pub async fn get_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    ApiPath(appointment_id): ApiPath<Uuid>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let appointment = service.get_appointment(appointment_id).await?;
    Ok(Json(appointment.into()))
}

pub async fn get_doctor_appointments(
    State(service): State<Arc<AppointmentBookingService>>,
    ApiPath(doctor_id): ApiPath<Uuid>,
) -> Result<Json<Vec<AppointmentResponse>>, AppError> {
    let appointments = service.list_doctor_appointments(doctor_id).await?;
    Ok(Json(appointments.into_iter().map(Into::into).collect()))
}

pub async fn get_patient_appointments(
    State(service): State<Arc<AppointmentBookingService>>,
    ApiPath(patient_id): ApiPath<Uuid>,
) -> Result<Json<Vec<AppointmentResponse>>, AppError> {
    let appointments = service.list_patient_appointments(patient_id).await?;
    Ok(Json(appointments.into_iter().map(Into::into).collect()))
}
