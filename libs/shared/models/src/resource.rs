use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of every appointment and of the reservation window it holds.
pub const APPOINTMENT_DURATION_MINUTES: i64 = 60;

pub fn appointment_end(start: DateTime<Utc>) -> DateTime<Utc> {
    start + Duration::minutes(APPOINTMENT_DURATION_MINUTES)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Facility,
    Equipment,
    Medicine,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Facility => write!(f, "facility"),
            ResourceType::Equipment => write!(f, "equipment"),
            ResourceType::Medicine => write!(f, "medicine"),
        }
    }
}

/// `{id, name, type}` summary of a reserved resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReservedResource {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

/// Everything reserved for one appointment. Doubles as the `resource-reserved` payload.
///
/// `start` is the window the rows were claimed for; an appointment only accepts a
/// reservation made for the instant it is currently booked at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReservedResources {
    pub appointment_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<ReservedResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility: Option<ReservedResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medicine: Option<ReservedResource>,
}

impl ReservedResources {
    pub fn empty(appointment_id: Uuid) -> Self {
        Self {
            appointment_id,
            start: None,
            equipment: None,
            facility: None,
            medicine: None,
        }
    }

    /// Nothing reserved yet, for the window starting at `start`.
    pub fn for_window(appointment_id: Uuid, start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            ..Self::empty(appointment_id)
        }
    }

    pub fn set(&mut self, resource: ReservedResource) {
        match resource.resource_type {
            ResourceType::Equipment => self.equipment = Some(resource),
            ResourceType::Facility => self.facility = Some(resource),
            ResourceType::Medicine => self.medicine = Some(resource),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.equipment.is_none() && self.facility.is_none() && self.medicine.is_none()
    }

    pub fn resource_ids(&self) -> Vec<Uuid> {
        [&self.equipment, &self.facility, &self.medicine]
            .into_iter()
            .flatten()
            .map(|resource| resource.id)
            .collect()
    }
}

/// Which of an appointment's reservations a release drops.
///
/// An empty `resource_ids` means every resource; no `start` means every window.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_ids: Vec<Uuid>,
}

impl ReleaseScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn window(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            resource_ids: Vec::new(),
        }
    }

    /// Exactly the rows described by `reserved`.
    pub fn of(reserved: &ReservedResources) -> Self {
        Self {
            start: reserved.start,
            resource_ids: reserved.resource_ids(),
        }
    }

    pub fn matches(&self, start: DateTime<Utc>, resource_id: Uuid) -> bool {
        self.start.map_or(true, |window| window == start)
            && (self.resource_ids.is_empty() || self.resource_ids.contains(&resource_id))
    }
}

/// Body of `POST /resources/{appointmentId}/reservations`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReserveResourcesRequest {
    pub start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medicine_id: Option<Uuid>,
}

impl ReserveResourcesRequest {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            facility_id: None,
            equipment_id: None,
            medicine_id: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.facility_id.is_none() && self.equipment_id.is_none() && self.medicine_id.is_none()
    }

    /// Requested ids in reservation order: equipment, facility, medicine.
    pub fn requested(&self) -> Vec<(ResourceType, Uuid)> {
        [
            (ResourceType::Equipment, self.equipment_id),
            (ResourceType::Facility, self.facility_id),
            (ResourceType::Medicine, self.medicine_id),
        ]
        .into_iter()
        .filter_map(|(kind, id)| id.map(|id| (kind, id)))
        .collect()
    }

    pub fn end(&self) -> DateTime<Utc> {
        appointment_end(self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requested_follows_reservation_order() {
        let facility = Uuid::new_v4();
        let medicine = Uuid::new_v4();
        let equipment = Uuid::new_v4();
        let request = ReserveResourcesRequest {
            start: Utc::now(),
            facility_id: Some(facility),
            equipment_id: Some(equipment),
            medicine_id: Some(medicine),
        };

        assert_eq!(
            request.requested(),
            vec![
                (ResourceType::Equipment, equipment),
                (ResourceType::Facility, facility),
                (ResourceType::Medicine, medicine),
            ]
        );
    }

    #[test]
    fn reserved_resources_use_event_field_names() {
        let appointment_id = Uuid::new_v4();
        let mut reserved = ReservedResources::empty(appointment_id);
        reserved.set(ReservedResource {
            id: Uuid::nil(),
            name: "MRI Machine".into(),
            resource_type: ResourceType::Equipment,
        });

        let value = serde_json::to_value(&reserved).unwrap();
        assert_eq!(
            value,
            json!({
                "appointmentId": appointment_id,
                "equipment": {"id": Uuid::nil(), "name": "MRI Machine", "type": "equipment"}
            })
        );
    }

    #[test]
    fn release_scope_narrows_by_window_and_resource() {
        let at = Utc::now();
        let facility = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(ReleaseScope::all().matches(at, other));
        assert!(ReleaseScope::window(at).matches(at, other));
        assert!(!ReleaseScope::window(at).matches(at + Duration::hours(2), other));

        let mut reserved = ReservedResources::for_window(Uuid::new_v4(), at);
        reserved.set(ReservedResource {
            id: facility,
            name: "Operating Room 1".into(),
            resource_type: ResourceType::Facility,
        });
        let scope = ReleaseScope::of(&reserved);
        assert!(scope.matches(at, facility));
        assert!(!scope.matches(at, other));
    }
}
