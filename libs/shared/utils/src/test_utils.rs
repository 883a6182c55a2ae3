use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::response::Response;
use chrono::{DateTime, Utc};
use http::{header, Method, Request, StatusCode};
use serde_json::Value;
use uuid::Uuid;

use shared_config::{AppConfig, BookingStrategy};

pub struct TestConfig {
    pub booking_strategy: BookingStrategy,
    pub resource_service_url: Option<String>,
    pub directory_service_url: Option<String>,
    pub workflow_engine_url: String,
    pub appointment_service_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            booking_strategy: BookingStrategy::Sync,
            resource_service_url: None,
            directory_service_url: None,
            workflow_engine_url: "http://localhost:8080/engine-rest".to_string(),
            appointment_service_url: "http://localhost:3000".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_strategy(strategy: BookingStrategy) -> Self {
        Self {
            booking_strategy: strategy,
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            booking_strategy: self.booking_strategy,
            resource_service_url: self.resource_service_url.clone(),
            directory_service_url: self.directory_service_url.clone(),
            workflow_engine_url: self.workflow_engine_url.clone(),
            appointment_service_url: self.appointment_service_url.clone(),
            http_timeout_seconds: 2,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// A doctor/patient pair for booking tests.
pub struct TestParticipants {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
}

impl Default for TestParticipants {
    fn default() -> Self {
        Self {
            doctor_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
        }
    }
}

/// Parses an RFC3339 literal; test input only.
pub fn instant(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("test instant must be RFC3339")
        .with_timezone(&Utc)
}

pub fn json_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };

    builder.body(body).expect("test request must build")
}

/// Splits a router response into status and JSON body (`Value::Null` when empty).
pub async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body must be readable");

    if bytes.is_empty() {
        return (status, Value::Null);
    }

    let value = serde_json::from_slice(&bytes).expect("response body must be JSON");
    (status, value)
}
