use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Duration;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::resource::ReserveResourcesRequest;

pub const RESERVE_RESOURCES_TOPIC: &str = "appointment-reserve-resources";

// ==============================================================================
// ENGINE WIRE MODELS
// ==============================================================================

/// A typed process variable as the engine's REST API represents it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariableValue {
    #[serde(default)]
    pub value: Value,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
}

impl VariableValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value: Value::String(value.into()),
            value_type: Some("String".to_string()),
        }
    }
}

pub type Variables = HashMap<String, VariableValue>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartProcessRequest {
    pub business_key: String,
    pub variables: Variables,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInstance {
    pub id: String,
    #[serde(default)]
    pub business_key: Option<String>,
    #[serde(default)]
    pub definition_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchTopic {
    pub topic_name: String,
    pub lock_duration: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchAndLockRequest {
    pub worker_id: String,
    pub max_tasks: u32,
    pub use_priority: bool,
    pub async_response_timeout: u64,
    pub topics: Vec<FetchTopic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTask {
    pub id: String,
    pub topic_name: String,
    #[serde(default)]
    pub worker_id: Option<String>,
    #[serde(default)]
    pub business_key: Option<String>,
    #[serde(default)]
    pub process_instance_id: Option<String>,
    #[serde(default)]
    pub retries: Option<i32>,
    #[serde(default)]
    pub variables: Variables,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub worker_id: String,
    pub variables: Variables,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRequest {
    pub worker_id: String,
    pub error_message: String,
    pub retries: i32,
    pub retry_timeout: u64,
}

// ==============================================================================
// TASK PAYLOAD
// ==============================================================================

/// Variables of a reserve-resources task once validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveResourcesTask {
    pub appointment_id: Uuid,
    pub appointment_date_time: DateTime<Utc>,
    pub facility_id: Option<Uuid>,
    pub equipment_id: Option<Uuid>,
    pub medicine_id: Option<Uuid>,
}

impl ReserveResourcesTask {
    pub fn reservation_request(&self) -> ReserveResourcesRequest {
        ReserveResourcesRequest {
            start: self.appointment_date_time,
            facility_id: self.facility_id,
            equipment_id: self.equipment_id,
            medicine_id: self.medicine_id,
        }
    }

    pub fn to_variables(&self) -> Variables {
        let mut variables = Variables::new();
        variables.insert(
            "appointmentId".to_string(),
            VariableValue::string(self.appointment_id.to_string()),
        );
        variables.insert(
            "appointmentDateTime".to_string(),
            VariableValue::string(self.appointment_date_time.to_rfc3339()),
        );
        for (name, id) in [
            ("facilityId", self.facility_id),
            ("equipmentId", self.equipment_id),
            ("medicineId", self.medicine_id),
        ] {
            if let Some(id) = id {
                variables.insert(name.to_string(), VariableValue::string(id.to_string()));
            }
        }
        variables
    }
}

/// How a single task ended from the worker's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed { error_message: String },
}

// ==============================================================================
// WORKER CONFIGURATION
// ==============================================================================

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub topic_name: String,
    pub lock_duration_ms: u64,
    pub max_tasks: u32,
    pub max_parallel_tasks: usize,
    pub async_response_timeout_ms: u64,
    /// Pause between fetches when the engine had nothing to hand out.
    pub fetch_interval: Duration,
    pub graceful_shutdown_timeout_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: "resource-reservation-worker".to_string(),
            topic_name: RESERVE_RESOURCES_TOPIC.to_string(),
            lock_duration_ms: 5000,
            max_tasks: 10,
            max_parallel_tasks: 100,
            async_response_timeout_ms: 5000,
            fetch_interval: Duration::from_secs(5),
            graceful_shutdown_timeout_seconds: 30,
        }
    }
}

impl WorkerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            worker_id: config.workflow_worker_id.clone(),
            ..Self::default()
        }
    }

    pub fn fetch_request(&self, max_tasks: u32) -> FetchAndLockRequest {
        FetchAndLockRequest {
            worker_id: self.worker_id.clone(),
            max_tasks,
            use_priority: false,
            async_response_timeout: self.async_response_timeout_ms,
            topics: vec![FetchTopic {
                topic_name: self.topic_name.clone(),
                lock_duration: self.lock_duration_ms,
            }],
        }
    }
}
