use tracing::info;
use uuid::{uuid, Uuid};

use crate::error::ResourceError;
use crate::models::{Resource, ResourceType};
use crate::store::ResourceStore;

pub const OPERATING_ROOM_1: Uuid = uuid!("399ae499-ac47-468a-9c76-0a58c028141a");
pub const CONSULTATION_ROOM_A: Uuid = uuid!("76673eca-82e1-46dd-b54a-d80fc02c3eaf");
pub const MRI_MACHINE: Uuid = uuid!("660ee5f2-3ec2-4b71-a7b9-4cd2cc9c9a48");
pub const XRAY_MACHINE: Uuid = uuid!("32aeb6b4-100a-459e-bece-15a0d24af9ae");
pub const PAINKILLERS: Uuid = uuid!("6241705f-f56d-4ce9-aed4-03d3295a4159");
pub const ANTIBIOTICS: Uuid = uuid!("24430efc-8308-4f1e-8cab-15f6d43216a5");

pub fn default_catalog() -> Vec<Resource> {
    [
        (OPERATING_ROOM_1, "Operating Room 1", ResourceType::Facility),
        (CONSULTATION_ROOM_A, "Consultation Room A", ResourceType::Facility),
        (MRI_MACHINE, "MRI Machine", ResourceType::Equipment),
        (XRAY_MACHINE, "X-ray Machine", ResourceType::Equipment),
        (PAINKILLERS, "Painkillers", ResourceType::Medicine),
        (ANTIBIOTICS, "Antibiotics", ResourceType::Medicine),
    ]
    .into_iter()
    .map(|(id, name, resource_type)| Resource {
        id,
        name: name.to_string(),
        resource_type,
    })
    .collect()
}

/// Inserts the fixed catalog. Safe to call on every startup.
pub async fn seed_catalog(store: &dyn ResourceStore) -> Result<usize, ResourceError> {
    let mut seeded = 0;
    for resource in default_catalog() {
        if store.resource_by_id(resource.id).await?.is_none() {
            store.insert_resource(resource).await?;
            seeded += 1;
        }
    }

    info!("Resource catalog ready ({} seeded)", seeded);
    Ok(seeded)
}
