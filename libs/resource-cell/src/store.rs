use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::ResourceError;
use crate::models::{ClaimOutcome, ReleaseScope, Reservation, ReservationClaim, Resource};
use crate::services::conflict;

/// Resources and their reservations.
///
/// Implementations must make `try_claim` atomic: the overlap check and the write happen as
/// one operation, so two appointments can never both claim an overlapping window.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn insert_resource(&self, resource: Resource) -> Result<Resource, ResourceError>;

    async fn resource_by_id(&self, id: Uuid) -> Result<Option<Resource>, ResourceError>;

    async fn list_resources(&self) -> Result<Vec<Resource>, ResourceError>;

    /// Claims `[start, end)` on a resource for an appointment, upserting by
    /// `(appointment_id, resource_id)`.
    async fn try_claim(&self, claim: ReservationClaim) -> Result<ClaimOutcome, ResourceError>;

    /// Puts a replaced row back, keeping its id. Conflict-checked like a claim.
    async fn restore(&self, previous: Reservation) -> Result<(), ResourceError>;

    /// Drops the appointment's reservations that fall in `scope` and returns them. Matching
    /// and removal happen as one operation, so a row re-claimed for another window in the
    /// meantime is left alone.
    async fn release_matching(
        &self,
        appointment_id: Uuid,
        scope: &ReleaseScope,
    ) -> Result<Vec<Reservation>, ResourceError>;

    async fn reservations_for_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Vec<Reservation>, ResourceError>;

    /// Ids of resources with a reservation covering `instant`.
    async fn reserved_at(&self, instant: DateTime<Utc>) -> Result<HashSet<Uuid>, ResourceError>;
}

type ReservationKey = (Uuid, Uuid);

#[derive(Default)]
pub struct InMemoryResourceStore {
    resources: RwLock<HashMap<Uuid, Resource>>,
    reservations: RwLock<HashMap<ReservationKey, Reservation>>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn insert_resource(&self, resource: Resource) -> Result<Resource, ResourceError> {
        let mut resources = self.resources.write().await;
        resources.insert(resource.id, resource.clone());
        Ok(resource)
    }

    async fn resource_by_id(&self, id: Uuid) -> Result<Option<Resource>, ResourceError> {
        Ok(self.resources.read().await.get(&id).cloned())
    }

    async fn list_resources(&self) -> Result<Vec<Resource>, ResourceError> {
        let mut resources: Vec<Resource> = self.resources.read().await.values().cloned().collect();
        resources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(resources)
    }

    async fn try_claim(&self, claim: ReservationClaim) -> Result<ClaimOutcome, ResourceError> {
        let resource = self
            .resources
            .read()
            .await
            .get(&claim.resource_id)
            .cloned()
            .ok_or_else(|| ResourceError::resource_not_found(claim.resource_id))?;

        let mut reservations = self.reservations.write().await;

        conflict::check_claim(
            reservations.values(),
            claim.appointment_id,
            claim.resource_id,
            claim.start,
            claim.end,
        )?;

        let key = (claim.appointment_id, claim.resource_id);
        let previous = reservations.get(&key).cloned();

        let reservation = Reservation {
            id: previous.as_ref().map(|p| p.id).unwrap_or_else(Uuid::new_v4),
            appointment_id: claim.appointment_id,
            resource_id: resource.id,
            resource_name: resource.name,
            resource_type: resource.resource_type,
            start: claim.start,
            end: claim.end,
        };
        reservations.insert(key, reservation.clone());

        debug!(
            "Reservation {} for appointment {} on resource {} stored ({})",
            reservation.id,
            reservation.appointment_id,
            reservation.resource_id,
            if previous.is_some() { "updated" } else { "inserted" }
        );

        Ok(ClaimOutcome {
            reservation,
            previous,
        })
    }

    async fn restore(&self, previous: Reservation) -> Result<(), ResourceError> {
        let mut reservations = self.reservations.write().await;

        conflict::check_claim(
            reservations.values(),
            previous.appointment_id,
            previous.resource_id,
            previous.start,
            previous.end,
        )?;

        reservations.insert((previous.appointment_id, previous.resource_id), previous);
        Ok(())
    }

    async fn release_matching(
        &self,
        appointment_id: Uuid,
        scope: &ReleaseScope,
    ) -> Result<Vec<Reservation>, ResourceError> {
        let mut reservations = self.reservations.write().await;
        let keys: Vec<ReservationKey> = reservations
            .iter()
            .filter(|((owner, _), r)| {
                *owner == appointment_id && scope.matches(r.start, r.resource_id)
            })
            .map(|(key, _)| *key)
            .collect();

        Ok(keys
            .into_iter()
            .filter_map(|key| reservations.remove(&key))
            .collect())
    }

    async fn reservations_for_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Vec<Reservation>, ResourceError> {
        let mut owned: Vec<Reservation> = self
            .reservations
            .read()
            .await
            .values()
            .filter(|r| r.appointment_id == appointment_id)
            .cloned()
            .collect();
        owned.sort_by_key(|r| (r.start, r.resource_id));
        Ok(owned)
    }

    async fn reserved_at(&self, instant: DateTime<Utc>) -> Result<HashSet<Uuid>, ResourceError> {
        Ok(self
            .reservations
            .read()
            .await
            .values()
            .filter(|r| r.covers(instant))
            .map(|r| r.resource_id)
            .collect())
    }
}
