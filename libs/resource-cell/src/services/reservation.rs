use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::ResourceError;
use crate::models::{
    AvailableResources, ClaimOutcome, CreateResourceRequest, ReleaseScope, Reservation,
    ReservationClaim, ReserveResourcesRequest, ReservedResources, Resource, ResourceType,
};
use crate::services::conflict;
use crate::store::ResourceStore;

pub struct ReservationService {
    store: Arc<dyn ResourceStore>,
}

impl ReservationService {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Reserves every requested resource for one appointment, or none of them.
    ///
    /// Each claim remembers the row it replaced; when a later claim fails the earlier ones
    /// are compensated in reverse order (restored to the replaced row, or released). A
    /// replaced row that can no longer be restored is dropped together with the new claim,
    /// so a failed call never leaves the appointment holding the new window.
    #[instrument(skip(self, request), fields(appointment_id = %appointment_id))]
    pub async fn reserve_appointment_resources(
        &self,
        appointment_id: Uuid,
        request: &ReserveResourcesRequest,
    ) -> Result<ReservedResources, ResourceError> {
        let start = request.start;
        let end = request.end();
        conflict::validate_interval(start, end)?;

        let mut completed: Vec<ClaimOutcome> = Vec::new();
        let mut reserved = ReservedResources::for_window(appointment_id, start);

        for (expected_type, resource_id) in request.requested() {
            match self
                .claim_one(appointment_id, expected_type, resource_id, start, end)
                .await
            {
                Ok(outcome) => {
                    reserved.set(outcome.reservation.summary());
                    completed.push(outcome);
                }
                Err(e) => {
                    warn!(
                        "Reserving {} {} for appointment {} failed: {}",
                        expected_type, resource_id, appointment_id, e
                    );
                    self.compensate(completed).await;
                    return Err(e);
                }
            }
        }

        info!(
            "Reserved {} resource(s) for appointment {} from {}",
            completed_count(&reserved),
            appointment_id,
            start
        );
        Ok(reserved)
    }

    async fn claim_one(
        &self,
        appointment_id: Uuid,
        expected_type: ResourceType,
        resource_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ClaimOutcome, ResourceError> {
        let resource = self
            .store
            .resource_by_id(resource_id)
            .await?
            .ok_or_else(|| ResourceError::resource_not_found(resource_id))?;

        if resource.resource_type != expected_type {
            return Err(ResourceError::type_mismatch(
                resource_id,
                expected_type,
                resource.resource_type,
            ));
        }

        self.store
            .try_claim(ReservationClaim {
                appointment_id,
                resource_id,
                start,
                end,
            })
            .await
    }

    async fn compensate(&self, completed: Vec<ClaimOutcome>) {
        for outcome in completed.into_iter().rev() {
            let reservation = outcome.reservation;
            let result = match outcome.previous {
                Some(previous) => match self.store.restore(previous).await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        warn!(
                            "Replaced reservation {} on resource {} cannot be restored ({}), dropping the new claim",
                            reservation.id, reservation.resource_id, e
                        );
                        self.drop_claim(&reservation).await
                    }
                },
                None => self.drop_claim(&reservation).await,
            };

            match result {
                Ok(()) => debug!(
                    "Compensated reservation {} on resource {}",
                    reservation.id, reservation.resource_id
                ),
                Err(e) => error!(
                    "Compensation of reservation {} on resource {} failed: {}",
                    reservation.id, reservation.resource_id, e
                ),
            }
        }
    }

    async fn drop_claim(&self, reservation: &Reservation) -> Result<(), ResourceError> {
        let scope = ReleaseScope {
            start: Some(reservation.start),
            resource_ids: vec![reservation.resource_id],
        };
        self.store
            .release_matching(reservation.appointment_id, &scope)
            .await
            .map(|_| ())
    }

    /// Drops every reservation the appointment owns.
    pub async fn release_appointment_resources(
        &self,
        appointment_id: Uuid,
    ) -> Result<Vec<Reservation>, ResourceError> {
        self.release_reservations(appointment_id, &ReleaseScope::all())
            .await
    }

    #[instrument(skip(self, scope))]
    pub async fn release_reservations(
        &self,
        appointment_id: Uuid,
        scope: &ReleaseScope,
    ) -> Result<Vec<Reservation>, ResourceError> {
        let released = self.store.release_matching(appointment_id, scope).await?;
        info!(
            "Released {} reservation(s) of appointment {}",
            released.len(),
            appointment_id
        );
        Ok(released)
    }

    pub async fn reservations_for_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Vec<Reservation>, ResourceError> {
        self.store.reservations_for_appointment(appointment_id).await
    }

    pub async fn available_resources(
        &self,
        at: DateTime<Utc>,
    ) -> Result<AvailableResources, ResourceError> {
        let reserved = self.store.reserved_at(at).await?;
        let mut available = AvailableResources::default();

        for resource in self.store.list_resources().await? {
            if !reserved.contains(&resource.id) {
                available.push(resource);
            }
        }

        Ok(available)
    }

    pub async fn get_resource(&self, id: Uuid) -> Result<Resource, ResourceError> {
        self.store
            .resource_by_id(id)
            .await?
            .ok_or_else(|| ResourceError::resource_not_found(id))
    }

    pub async fn create_resource(
        &self,
        request: CreateResourceRequest,
    ) -> Result<Resource, ResourceError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ResourceError::ValidationError(
                "Resource name must not be empty".to_string(),
            ));
        }

        let resource = Resource::new(name, request.resource_type);
        info!("Creating {} resource '{}'", resource.resource_type, resource.name);
        self.store.insert_resource(resource).await
    }
}

fn completed_count(reserved: &ReservedResources) -> usize {
    [
        reserved.equipment.is_some(),
        reserved.facility.is_some(),
        reserved.medicine.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count()
}
