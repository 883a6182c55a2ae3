use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers;
use crate::services::booking::AppointmentBookingService;

pub fn appointment_routes(service: Arc<AppointmentBookingService>) -> Router {
    Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/{id}", get(handlers::get_appointment))
        .route("/{id}/decision", put(handlers::decide_appointment))
        .route("/{id}/reschedule", put(handlers::reschedule_appointment))
        .route("/{id}/cancel", post(handlers::cancel_appointment))
        .route("/{id}/resources", put(handlers::confirm_resources))
        // Appointment listings
        .route("/doctors/{id}", get(handlers::get_doctor_appointments))
        .route("/patients/{id}", get(handlers::get_patient_appointments))
        .with_state(service)
}
