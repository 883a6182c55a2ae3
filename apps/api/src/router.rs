use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::{appointment_routes, AppointmentBookingService};
use resource_cell::{resource_routes, ReservationService};

pub fn create_router(
    booking: Arc<AppointmentBookingService>,
    reservations: Arc<ReservationService>,
) -> Router {
    let strategy = booking.strategy();

    Router::new()
        .route(
            "/",
            get(move || async move { format!("Booking API is running ({} strategy)", strategy) }),
        )
        .nest("/appointments", appointment_routes(booking))
        .nest("/resources", resource_routes(reservations))
}

#[cfg(test)]
mod tests {
    use super::*;

    use http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use appointment_cell::{InMemoryAppointmentStore, SyncCoordinator, UncheckedDirectory};
    use resource_cell::services::catalog::CONSULTATION_ROOM_A;
    use resource_cell::{seed_catalog, InMemoryResourceStore};
    use shared_utils::test_utils::{json_request, read_json, TestParticipants};

    async fn router() -> Router {
        let resource_store = Arc::new(InMemoryResourceStore::new());
        seed_catalog(resource_store.as_ref()).await.unwrap();
        let reservations = Arc::new(ReservationService::new(resource_store));

        let appointments = Arc::new(InMemoryAppointmentStore::new());
        let coordinator = Arc::new(SyncCoordinator::new(
            appointments.clone(),
            reservations.clone(),
        ));
        let booking = Arc::new(AppointmentBookingService::new(
            appointments,
            coordinator,
            reservations.clone(),
            Arc::new(UncheckedDirectory),
        ));

        create_router(booking, reservations)
    }

    #[tokio::test]
    async fn root_reports_strategy() {
        let response = router()
            .await
            .oneshot(json_request(Method::GET, "/", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn accepted_appointment_shows_up_in_resource_reservations() {
        let app = router().await;
        let participants = TestParticipants::default();

        let (status, created) = read_json(
            app.clone()
                .oneshot(json_request(
                    Method::POST,
                    "/appointments",
                    Some(json!({
                        "patientId": participants.patient_id,
                        "doctorId": participants.doctor_id,
                        "appointmentDateTime": "2025-01-01T09:00:00Z",
                        "type": "consultation"
                    })),
                ))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, scheduled) = read_json(
            app.clone()
                .oneshot(json_request(
                    Method::PUT,
                    &format!("/appointments/{}/decision", id),
                    Some(json!({ "action": "accept", "facilityId": CONSULTATION_ROOM_A })),
                ))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(scheduled["status"], "scheduled");

        let (status, held) = read_json(
            app.oneshot(json_request(
                Method::GET,
                &format!("/resources/{}/reservations", id),
                None,
            ))
            .await
            .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(held.as_array().map(Vec::len), Some(1));
    }
}
