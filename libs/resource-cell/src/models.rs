use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use shared_models::resource::{
    appointment_end, ReleaseScope, ReserveResourcesRequest, ReservedResource, ReservedResources,
    ResourceType,
};

// ==============================================================================
// RESOURCE CATALOG
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

impl Resource {
    pub fn new(name: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            resource_type,
        }
    }

    pub fn summary(&self) -> ReservedResource {
        ReservedResource {
            id: self.id,
            name: self.name.clone(),
            resource_type: self.resource_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResourceRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

/// Resources free at an instant, grouped by type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailableResources {
    pub facilities: Vec<Resource>,
    pub equipment: Vec<Resource>,
    pub medicine: Vec<Resource>,
}

impl AvailableResources {
    pub fn push(&mut self, resource: Resource) {
        match resource.resource_type {
            ResourceType::Facility => self.facilities.push(resource),
            ResourceType::Equipment => self.equipment.push(resource),
            ResourceType::Medicine => self.medicine.push(resource),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    #[serde(rename = "dateTime")]
    pub date_time: DateTime<Utc>,
}

// ==============================================================================
// RESERVATIONS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub resource_id: Uuid,
    pub resource_name: String,
    pub resource_type: ResourceType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Reservation {
    pub fn summary(&self) -> ReservedResource {
        ReservedResource {
            id: self.resource_id,
            name: self.resource_name.clone(),
            resource_type: self.resource_type,
        }
    }

    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Request for exclusive use of one resource over `[start, end)` by one appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationClaim {
    pub appointment_id: Uuid,
    pub resource_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Result of a successful claim. `previous` is the row the claim replaced, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub reservation: Reservation,
    pub previous: Option<Reservation>,
}
