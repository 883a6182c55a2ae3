use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ResourceError;
use crate::models::Reservation;

/// Half-open interval overlap: `[start1, end1)` and `[start2, end2)`.
pub fn intervals_overlap(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && start2 < end1
}

pub fn validate_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ResourceError> {
    if end <= start {
        return Err(ResourceError::invalid_interval(start, end));
    }
    Ok(())
}

/// First reservation of `resource_id` held by another appointment that overlaps `[start, end)`.
///
/// Reservations owned by `appointment_id` itself never conflict, so re-reserving for the
/// same appointment replaces its own row.
pub fn find_conflict<'a, I>(
    existing: I,
    appointment_id: Uuid,
    resource_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<&'a Reservation>
where
    I: IntoIterator<Item = &'a Reservation>,
{
    existing.into_iter().find(|reservation| {
        reservation.resource_id == resource_id
            && reservation.appointment_id != appointment_id
            && intervals_overlap(reservation.start, reservation.end, start, end)
    })
}

pub fn check_claim<'a, I>(
    existing: I,
    appointment_id: Uuid,
    resource_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), ResourceError>
where
    I: IntoIterator<Item = &'a Reservation>,
{
    validate_interval(start, end)?;

    match find_conflict(existing, appointment_id, resource_id, start, end) {
        Some(conflict) => {
            tracing::debug!(
                "Resource {} conflicts with reservation {} of appointment {}",
                resource_id,
                conflict.id,
                conflict.appointment_id
            );
            Err(ResourceError::unavailable(
                resource_id,
                conflict.start,
                conflict.end,
            ))
        }
        None => Ok(()),
    }
}
