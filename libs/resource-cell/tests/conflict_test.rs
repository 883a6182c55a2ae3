use assert_matches::assert_matches;
use chrono::Duration;
use uuid::Uuid;

use resource_cell::models::{Reservation, ResourceType};
use resource_cell::services::conflict::{
    check_claim, find_conflict, intervals_overlap, validate_interval,
};
use resource_cell::ResourceError;
use shared_utils::test_utils::instant;

fn reservation(appointment_id: Uuid, resource_id: Uuid, start: &str, minutes: i64) -> Reservation {
    let start = instant(start);
    Reservation {
        id: Uuid::new_v4(),
        appointment_id,
        resource_id,
        resource_name: "Operating Room 1".to_string(),
        resource_type: ResourceType::Facility,
        start,
        end: start + Duration::minutes(minutes),
    }
}

#[test]
fn touching_intervals_do_not_overlap() {
    let nine = instant("2025-01-01T09:00:00Z");
    let ten = instant("2025-01-01T10:00:00Z");
    let eleven = instant("2025-01-01T11:00:00Z");

    assert!(!intervals_overlap(nine, ten, ten, eleven));
    assert!(!intervals_overlap(ten, eleven, nine, ten));
    assert!(intervals_overlap(nine, eleven, ten, eleven));
    assert!(intervals_overlap(nine, ten, nine, ten));
}

#[test]
fn own_reservation_never_conflicts() {
    let appointment = Uuid::new_v4();
    let resource = Uuid::new_v4();
    let existing = vec![reservation(appointment, resource, "2025-01-01T09:00:00Z", 60)];

    let start = instant("2025-01-01T09:30:00Z");
    let end = start + Duration::hours(1);

    assert!(find_conflict(&existing, appointment, resource, start, end).is_none());
    assert!(check_claim(&existing, appointment, resource, start, end).is_ok());
}

#[test]
fn other_appointment_on_same_resource_conflicts() {
    let resource = Uuid::new_v4();
    let holder = reservation(Uuid::new_v4(), resource, "2025-01-01T09:00:00Z", 60);
    let existing = vec![holder.clone()];

    let start = instant("2025-01-01T09:59:00Z");
    let found = find_conflict(&existing, Uuid::new_v4(), resource, start, start + Duration::hours(1));
    assert_eq!(found.map(|r| r.id), Some(holder.id));

    let result = check_claim(&existing, Uuid::new_v4(), resource, start, start + Duration::hours(1));
    assert_matches!(result, Err(ResourceError::Unavailable(_)));
}

#[test]
fn other_resources_are_ignored() {
    let existing = vec![reservation(
        Uuid::new_v4(),
        Uuid::new_v4(),
        "2025-01-01T09:00:00Z",
        60,
    )];

    let start = instant("2025-01-01T09:00:00Z");
    assert!(find_conflict(&existing, Uuid::new_v4(), Uuid::new_v4(), start, start + Duration::hours(1)).is_none());
}

#[test]
fn empty_or_inverted_interval_is_rejected() {
    let start = instant("2025-01-01T09:00:00Z");

    assert_matches!(validate_interval(start, start), Err(ResourceError::ValidationError(_)));
    assert_matches!(
        validate_interval(start, start - Duration::minutes(1)),
        Err(ResourceError::ValidationError(_))
    );
    assert!(validate_interval(start, start + Duration::minutes(1)).is_ok());
}
