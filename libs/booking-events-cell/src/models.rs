use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::resource::{ReserveResourcesRequest, ReservedResources};

use crate::error::BookingEventsError;

// ==============================================================================
// TOPICS
// ==============================================================================

pub const APPOINTMENT_SCHEDULED: &str = "appointment-scheduled";
pub const RESOURCE_RESERVED: &str = "resource-reserved";
pub const RESOURCE_RESERVATION_FAILED: &str = "resource-reservation-failed";

// ==============================================================================
// EVENT PAYLOADS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentScheduledEvent {
    pub appointment_id: Uuid,
    pub appointment_date_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medicine_id: Option<Uuid>,
}

impl AppointmentScheduledEvent {
    pub fn reservation_request(&self) -> ReserveResourcesRequest {
        ReserveResourcesRequest {
            start: self.appointment_date_time,
            facility_id: self.facility_id,
            equipment_id: self.equipment_id,
            medicine_id: self.medicine_id,
        }
    }
}

/// Payload of `resource-reserved`: the summaries of what was reserved.
pub type ResourceReservedEvent = ReservedResources;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReservationFailedEvent {
    pub appointment_id: Uuid,
    /// Window the failed reservation was for.
    pub appointment_date_time: DateTime<Utc>,
    pub code: String,
    pub message: String,
    pub attempts: u32,
}

// ==============================================================================
// ENVELOPE
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub topic: String,
    /// Partitioning key; always the appointment id.
    pub key: String,
    pub payload: serde_json::Value,
    pub published_at: DateTime<Utc>,
    /// 1 on first delivery, incremented on every redelivery.
    pub delivery_attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Transport handle used to acknowledge this delivery.
    #[serde(skip)]
    pub receipt: Option<String>,
}

impl EventEnvelope {
    pub fn new<T: Serialize>(
        topic: &str,
        key: Uuid,
        payload: &T,
    ) -> Result<Self, BookingEventsError> {
        Ok(Self {
            event_id: Uuid::new_v4(),
            topic: topic.to_string(),
            key: key.to_string(),
            payload: serde_json::to_value(payload)?,
            published_at: Utc::now(),
            delivery_attempt: 1,
            last_error: None,
            receipt: None,
        })
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, BookingEventsError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            BookingEventsError::InvalidPayload(format!("{} on {}: {}", self.event_id, self.topic, e))
        })
    }

    /// The envelope as it is handed out again on redelivery.
    pub fn redelivery(mut self, error: &str) -> Self {
        self.delivery_attempt += 1;
        self.last_error = Some(error.to_string());
        self.receipt = None;
        self
    }
}

// ==============================================================================
// CONSUMER CONFIGURATION
// ==============================================================================

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub consumer_id: String,
    /// Deliveries (first attempt included) before a transient failure is dead-lettered.
    pub max_delivery_attempts: u32,
    pub poll_timeout_ms: u64,
    pub error_backoff_ms: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            consumer_id: format!("consumer-{}", Uuid::new_v4()),
            max_delivery_attempts: 3,
            poll_timeout_ms: 1000,
            error_backoff_ms: 5000,
        }
    }
}

impl ConsumerConfig {
    pub fn from_app_config(consumer_id: &str, config: &AppConfig) -> Self {
        Self {
            consumer_id: consumer_id.to_string(),
            max_delivery_attempts: config.event_max_delivery_attempts.max(1),
            ..Self::default()
        }
    }
}
