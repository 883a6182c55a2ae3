use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use tracing::debug;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_utils::extractor::{ApiJson, ApiPath, ApiQuery};

use crate::models::{
    AvailabilityQuery, AvailableResources, CreateResourceRequest, ReleaseScope, Reservation,
    ReserveResourcesRequest, Resource,
};
use crate::services::reservation::ReservationService;

// ==============================================================================
// RESERVATION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn reserve_resources(
    State(service): State<Arc<ReservationService>>,
    ApiPath(appointment_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ReserveResourcesRequest>,
) -> Result<StatusCode, AppError> {
    service
        .reserve_appointment_resources(appointment_id, &request)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_appointment_reservations(
    State(service): State<Arc<ReservationService>>,
    ApiPath(appointment_id): ApiPath<Uuid>,
) -> Result<Json<Vec<Reservation>>, AppError> {
    let reservations = service.reservations_for_appointment(appointment_id).await?;
    Ok(Json(reservations))
}

pub async fn release_reservations(
    State(service): State<Arc<ReservationService>>,
    ApiPath(appointment_id): ApiPath<Uuid>,
) -> Result<StatusCode, AppError> {
    service.release_appointment_resources(appointment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Drops only the rows in the given window and/or on the given resources.
pub async fn release_matching_reservations(
    State(service): State<Arc<ReservationService>>,
    ApiPath(appointment_id): ApiPath<Uuid>,
    ApiJson(scope): ApiJson<ReleaseScope>,
) -> Result<StatusCode, AppError> {
    service.release_reservations(appointment_id, &scope).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// CATALOG HANDLERS
// ==============================================================================

pub async fn get_available_resources(
    State(service): State<Arc<ReservationService>>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> Result<Json<AvailableResources>, AppError> {
    debug!("Listing resources available at {}", query.date_time);
    let available = service.available_resources(query.date_time).await?;
    Ok(Json(available))
}

pub async fn get_resource(
    State(service): State<Arc<ReservationService>>,
    ApiPath(resource_id): ApiPath<Uuid>,
) -> Result<Json<Resource>, AppError> {
    Ok(Json(service.get_resource(resource_id).await?))
}

pub async fn create_resource(
    State(service): State<Arc<ReservationService>>,
    ApiJson(request): ApiJson<CreateResourceRequest>,
) -> Result<(StatusCode, Json<Resource>), AppError> {
    let resource = service.create_resource(request).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}
