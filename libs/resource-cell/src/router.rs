use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::reservation::ReservationService;

pub fn resource_routes(service: Arc<ReservationService>) -> Router {
    Router::new()
        .route("/", post(handlers::create_resource))
        .route("/available", get(handlers::get_available_resources))
        .route("/{id}", get(handlers::get_resource))
        .route(
            "/{id}/reservations",
            post(handlers::reserve_resources)
                .get(handlers::get_appointment_reservations)
                .delete(handlers::release_reservations),
        )
        .route(
            "/{id}/reservations/release",
            post(handlers::release_matching_reservations),
        )
        .with_state(service)
}
