use std::collections::HashSet;
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use resource_cell::models::{
    ClaimOutcome, CreateResourceRequest, ReleaseScope, Reservation, ReservationClaim,
    ReserveResourcesRequest, Resource, ResourceType,
};
use resource_cell::services::catalog::{
    ANTIBIOTICS, CONSULTATION_ROOM_A, MRI_MACHINE, OPERATING_ROOM_1, PAINKILLERS, XRAY_MACHINE,
};
use resource_cell::{seed_catalog, InMemoryResourceStore, ReservationService, ResourceError, ResourceStore};
use shared_utils::test_utils::instant;

/// Lets another appointment grab a replaced row's window right before it is restored.
struct WindowTakenBeforeRestore {
    inner: Arc<InMemoryResourceStore>,
    intruder: Uuid,
}

#[async_trait]
impl ResourceStore for WindowTakenBeforeRestore {
    async fn insert_resource(&self, resource: Resource) -> Result<Resource, ResourceError> {
        self.inner.insert_resource(resource).await
    }

    async fn resource_by_id(&self, id: Uuid) -> Result<Option<Resource>, ResourceError> {
        self.inner.resource_by_id(id).await
    }

    async fn list_resources(&self) -> Result<Vec<Resource>, ResourceError> {
        self.inner.list_resources().await
    }

    async fn try_claim(&self, claim: ReservationClaim) -> Result<ClaimOutcome, ResourceError> {
        self.inner.try_claim(claim).await
    }

    async fn restore(&self, previous: Reservation) -> Result<(), ResourceError> {
        self.inner
            .try_claim(ReservationClaim {
                appointment_id: self.intruder,
                resource_id: previous.resource_id,
                start: previous.start,
                end: previous.end,
            })
            .await?;
        self.inner.restore(previous).await
    }

    async fn release_matching(
        &self,
        appointment_id: Uuid,
        scope: &ReleaseScope,
    ) -> Result<Vec<Reservation>, ResourceError> {
        self.inner.release_matching(appointment_id, scope).await
    }

    async fn reservations_for_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Vec<Reservation>, ResourceError> {
        self.inner.reservations_for_appointment(appointment_id).await
    }

    async fn reserved_at(&self, instant: DateTime<Utc>) -> Result<HashSet<Uuid>, ResourceError> {
        self.inner.reserved_at(instant).await
    }
}

async fn seeded() -> (Arc<InMemoryResourceStore>, ReservationService) {
    let store = Arc::new(InMemoryResourceStore::new());
    tokio_test::assert_ok!(seed_catalog(store.as_ref()).await);
    let service = ReservationService::new(store.clone());
    (store, service)
}

fn request_at(rfc3339: &str) -> ReserveResourcesRequest {
    ReserveResourcesRequest::new(instant(rfc3339))
}

#[tokio::test]
async fn seeding_twice_is_a_no_op() {
    let (store, _) = seeded().await;
    assert_eq!(seed_catalog(store.as_ref()).await.unwrap(), 0);
    assert_eq!(store.list_resources().await.unwrap().len(), 6);
}

#[tokio::test]
async fn reserves_all_requested_resources_for_one_hour() {
    let (store, service) = seeded().await;
    let appointment = Uuid::new_v4();
    let mut request = request_at("2025-01-01T09:00:00Z");
    request.facility_id = Some(OPERATING_ROOM_1);
    request.equipment_id = Some(MRI_MACHINE);
    request.medicine_id = Some(PAINKILLERS);

    let reserved = service
        .reserve_appointment_resources(appointment, &request)
        .await
        .expect("reservation should succeed");

    assert_eq!(reserved.start, Some(request.start));
    assert_eq!(reserved.facility.as_ref().map(|r| r.name.as_str()), Some("Operating Room 1"));
    assert_eq!(reserved.equipment.as_ref().map(|r| r.id), Some(MRI_MACHINE));
    assert_eq!(reserved.medicine.as_ref().map(|r| r.resource_type), Some(ResourceType::Medicine));

    let rows = store.reservations_for_appointment(appointment).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows
        .iter()
        .all(|r| r.end - r.start == Duration::hours(1) && r.start == request.start));
}

#[tokio::test]
async fn re_reserving_for_same_appointment_updates_in_place() {
    let (store, service) = seeded().await;
    let appointment = Uuid::new_v4();
    let mut first = request_at("2025-01-01T09:00:00Z");
    first.facility_id = Some(OPERATING_ROOM_1);

    service.reserve_appointment_resources(appointment, &first).await.unwrap();
    let original = store.reservations_for_appointment(appointment).await.unwrap();

    let mut moved = request_at("2025-01-01T09:30:00Z");
    moved.facility_id = Some(OPERATING_ROOM_1);
    service.reserve_appointment_resources(appointment, &moved).await.unwrap();

    let updated = store.reservations_for_appointment(appointment).await.unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].id, original[0].id);
    assert_eq!(updated[0].start, instant("2025-01-01T09:30:00Z"));
}

#[tokio::test]
async fn overlapping_claim_by_other_appointment_is_rejected() {
    let (_, service) = seeded().await;
    let mut request = request_at("2025-01-01T09:00:00Z");
    request.facility_id = Some(OPERATING_ROOM_1);
    service.reserve_appointment_resources(Uuid::new_v4(), &request).await.unwrap();

    let mut overlapping = request_at("2025-01-01T09:30:00Z");
    overlapping.facility_id = Some(OPERATING_ROOM_1);
    let result = service
        .reserve_appointment_resources(Uuid::new_v4(), &overlapping)
        .await;

    assert_matches!(result, Err(ResourceError::Unavailable(_)));

    let mut adjacent = request_at("2025-01-01T10:00:00Z");
    adjacent.facility_id = Some(OPERATING_ROOM_1);
    assert!(service
        .reserve_appointment_resources(Uuid::new_v4(), &adjacent)
        .await
        .is_ok());
}

#[tokio::test]
async fn unknown_resource_is_not_found() {
    let (_, service) = seeded().await;
    let mut request = request_at("2025-01-01T09:00:00Z");
    request.equipment_id = Some(Uuid::new_v4());

    let result = service.reserve_appointment_resources(Uuid::new_v4(), &request).await;
    assert_matches!(result, Err(ResourceError::NotFound(_)));
}

#[tokio::test]
async fn id_in_wrong_slot_is_a_validation_error() {
    let (_, service) = seeded().await;
    let mut request = request_at("2025-01-01T09:00:00Z");
    request.facility_id = Some(ANTIBIOTICS);

    let result = service.reserve_appointment_resources(Uuid::new_v4(), &request).await;
    assert_matches!(result, Err(ResourceError::ValidationError(_)));
}

#[tokio::test]
async fn failed_member_releases_earlier_claims() {
    let (store, service) = seeded().await;

    let mut blocker = request_at("2025-01-01T09:00:00Z");
    blocker.facility_id = Some(CONSULTATION_ROOM_A);
    service.reserve_appointment_resources(Uuid::new_v4(), &blocker).await.unwrap();

    // Equipment is claimed first, then the facility conflicts.
    let appointment = Uuid::new_v4();
    let mut request = request_at("2025-01-01T09:00:00Z");
    request.equipment_id = Some(XRAY_MACHINE);
    request.facility_id = Some(CONSULTATION_ROOM_A);

    let result = service.reserve_appointment_resources(appointment, &request).await;
    assert_matches!(result, Err(ResourceError::Unavailable(_)));
    assert!(store.reservations_for_appointment(appointment).await.unwrap().is_empty());

    let available = service
        .available_resources(instant("2025-01-01T09:15:00Z"))
        .await
        .unwrap();
    assert!(available.equipment.iter().any(|r| r.id == XRAY_MACHINE));
}

#[tokio::test]
async fn failed_retry_restores_previous_window() {
    let (store, service) = seeded().await;
    let appointment = Uuid::new_v4();

    let mut original = request_at("2025-01-01T09:00:00Z");
    original.equipment_id = Some(MRI_MACHINE);
    service.reserve_appointment_resources(appointment, &original).await.unwrap();

    let mut blocker = request_at("2025-01-01T13:00:00Z");
    blocker.medicine_id = Some(PAINKILLERS);
    service.reserve_appointment_resources(Uuid::new_v4(), &blocker).await.unwrap();

    let mut moved = request_at("2025-01-01T13:00:00Z");
    moved.equipment_id = Some(MRI_MACHINE);
    moved.medicine_id = Some(PAINKILLERS);
    let result = service.reserve_appointment_resources(appointment, &moved).await;
    assert_matches!(result, Err(ResourceError::Unavailable(_)));

    let rows = store.reservations_for_appointment(appointment).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].start, instant("2025-01-01T09:00:00Z"));
}

#[tokio::test]
async fn unrestorable_window_drops_the_new_claim_too() {
    let inner = Arc::new(InMemoryResourceStore::new());
    tokio_test::assert_ok!(seed_catalog(inner.as_ref()).await);
    let intruder = Uuid::new_v4();
    let service = ReservationService::new(Arc::new(WindowTakenBeforeRestore {
        inner: inner.clone(),
        intruder,
    }));
    let appointment = Uuid::new_v4();

    let mut original = request_at("2025-01-01T09:00:00Z");
    original.facility_id = Some(OPERATING_ROOM_1);
    service.reserve_appointment_resources(appointment, &original).await.unwrap();

    let mut blocker = request_at("2025-01-01T14:00:00Z");
    blocker.medicine_id = Some(PAINKILLERS);
    service.reserve_appointment_resources(Uuid::new_v4(), &blocker).await.unwrap();

    let mut moved = request_at("2025-01-01T14:00:00Z");
    moved.facility_id = Some(OPERATING_ROOM_1);
    moved.medicine_id = Some(PAINKILLERS);
    let result = service.reserve_appointment_resources(appointment, &moved).await;
    assert_matches!(result, Err(ResourceError::Unavailable(_)));

    assert!(inner.reservations_for_appointment(appointment).await.unwrap().is_empty());
    let taken = inner.reservations_for_appointment(intruder).await.unwrap();
    assert_eq!(taken.len(), 1);
    assert_eq!(taken[0].start, instant("2025-01-01T09:00:00Z"));

    let afternoon = service.available_resources(instant("2025-01-01T14:15:00Z")).await.unwrap();
    assert!(afternoon.facilities.iter().any(|r| r.id == OPERATING_ROOM_1));
}

#[tokio::test]
async fn available_resources_exclude_reservations_covering_the_instant() {
    let (_, service) = seeded().await;
    let mut request = request_at("2025-01-01T09:00:00Z");
    request.facility_id = Some(OPERATING_ROOM_1);
    request.medicine_id = Some(ANTIBIOTICS);
    service.reserve_appointment_resources(Uuid::new_v4(), &request).await.unwrap();

    let during = service.available_resources(instant("2025-01-01T09:59:59Z")).await.unwrap();
    assert_eq!(during.facilities.len(), 1);
    assert_eq!(during.facilities[0].id, CONSULTATION_ROOM_A);
    assert_eq!(during.medicine.len(), 1);
    assert_eq!(during.equipment.len(), 2);

    let at_end = service.available_resources(instant("2025-01-01T10:00:00Z")).await.unwrap();
    assert_eq!(at_end.facilities.len(), 2);
    assert_eq!(at_end.medicine.len(), 2);
}

#[tokio::test]
async fn release_drops_every_owned_reservation() {
    let (store, service) = seeded().await;
    let appointment = Uuid::new_v4();
    let mut request = request_at("2025-01-01T09:00:00Z");
    request.facility_id = Some(OPERATING_ROOM_1);
    request.equipment_id = Some(MRI_MACHINE);
    service.reserve_appointment_resources(appointment, &request).await.unwrap();

    let released = service.release_appointment_resources(appointment).await.unwrap();
    assert_eq!(released.len(), 2);
    assert!(store.reservations_for_appointment(appointment).await.unwrap().is_empty());
    assert!(service.release_appointment_resources(appointment).await.unwrap().is_empty());
}

#[tokio::test]
async fn scoped_release_leaves_other_windows_and_resources() {
    let (store, service) = seeded().await;
    let appointment = Uuid::new_v4();
    let mut morning = request_at("2025-01-01T09:00:00Z");
    morning.facility_id = Some(OPERATING_ROOM_1);
    morning.equipment_id = Some(MRI_MACHINE);
    service.reserve_appointment_resources(appointment, &morning).await.unwrap();
    let mut afternoon = request_at("2025-01-01T15:00:00Z");
    afternoon.medicine_id = Some(ANTIBIOTICS);
    service.reserve_appointment_resources(appointment, &afternoon).await.unwrap();

    let released = service
        .release_reservations(
            appointment,
            &ReleaseScope {
                start: Some(morning.start),
                resource_ids: vec![MRI_MACHINE, ANTIBIOTICS],
            },
        )
        .await
        .unwrap();
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].resource_id, MRI_MACHINE);

    let held: Vec<Uuid> = store
        .reservations_for_appointment(appointment)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.resource_id)
        .collect();
    assert_eq!(held.len(), 2);
    assert!(held.contains(&OPERATING_ROOM_1));
    assert!(held.contains(&ANTIBIOTICS));
}

#[tokio::test]
async fn concurrent_claims_on_one_window_admit_a_single_winner() {
    let (store, _) = seeded().await;
    let start = instant("2025-01-01T09:00:00Z");

    let attempts = (0..16).map(|_| {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .try_claim(ReservationClaim {
                    appointment_id: Uuid::new_v4(),
                    resource_id: OPERATING_ROOM_1,
                    start,
                    end: start + Duration::hours(1),
                })
                .await
        })
    });

    let results = futures::future::join_all(attempts).await;
    let winners = results
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn created_resources_are_reservable() {
    let (_, service) = seeded().await;
    let resource = service
        .create_resource(CreateResourceRequest {
            name: "  Ultrasound  ".to_string(),
            resource_type: ResourceType::Equipment,
        })
        .await
        .unwrap();
    assert_eq!(resource.name, "Ultrasound");

    let mut request = request_at("2025-01-01T09:00:00Z");
    request.equipment_id = Some(resource.id);
    assert!(service.reserve_appointment_resources(Uuid::new_v4(), &request).await.is_ok());

    let blank = service
        .create_resource(CreateResourceRequest {
            name: " ".to_string(),
            resource_type: ResourceType::Facility,
        })
        .await;
    assert_matches!(blank, Err(ResourceError::ValidationError(_)));
}
