/// Endpoint smoke suite for a running booking API.
///
/// Walks an appointment through its lifecycle over HTTP and checks the status codes and
/// error codes callers rely on. Point it at a server with `API_BASE_URL`.
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const CONSULTATION_ROOM_A: &str = "76673eca-82e1-46dd-b54a-d80fc02c3eaf";

type TestError = Box<dyn std::error::Error>;

pub struct ApiTestClient {
    client: Client,
    base_url: String,
}

impl ApiTestClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: std::env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        }
    }

    pub async fn get(&self, path: &str) -> Result<Response, TestError> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?)
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Response, TestError> {
        Ok(self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await?)
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<Response, TestError> {
        Ok(self
            .client
            .put(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await?)
    }
}

/// Test results tracker
#[derive(Debug, Default)]
pub struct TestResults {
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub failures: Vec<String>,
}

impl TestResults {
    pub fn pass(&mut self, test_name: &str) {
        self.passed += 1;
        println!("✅ {}", test_name);
    }

    pub fn fail(&mut self, test_name: &str, error: &str) {
        self.failed += 1;
        self.failures.push(format!("{}: {}", test_name, error));
        println!("❌ {}: {}", test_name, error);
    }

    pub fn skip(&mut self, test_name: &str, reason: &str) {
        self.skipped += 1;
        println!("⚠️ {} (skipped: {})", test_name, reason);
    }

    /// Records a pass when the response has the expected status.
    pub async fn expect_status(
        &mut self,
        test_name: &str,
        response: Result<Response, TestError>,
        expected: StatusCode,
    ) -> Option<Value> {
        match response {
            Ok(response) if response.status() == expected => {
                self.pass(test_name);
                Some(response.json::<Value>().await.unwrap_or(Value::Null))
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                self.fail(test_name, &format!("Status: {} Body: {}", status, body));
                None
            }
            Err(e) => {
                self.fail(test_name, &e.to_string());
                None
            }
        }
    }

    pub fn summary(&self) {
        println!("\n📊 Test Summary:");
        println!("✅ Passed: {}", self.passed);
        println!("❌ Failed: {}", self.failed);
        println!("⚠️ Skipped: {}", self.skipped);

        if !self.failures.is_empty() {
            println!("\n🔍 Failures:");
            for failure in &self.failures {
                println!("  - {}", failure);
            }
        }
    }
}

fn appointment_body(patient_id: Uuid, doctor_id: Uuid, at: &str) -> Value {
    json!({
        "patientId": patient_id,
        "doctorId": doctor_id,
        "appointmentDateTime": at,
        "type": "consultation",
        "reason": "Follow-up consultation"
    })
}

pub async fn run_endpoint_tests() -> Result<TestResults, TestError> {
    let client = ApiTestClient::new();
    let mut results = TestResults::default();
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    println!("🚀 Starting Booking Endpoint Tests");
    println!("📍 Base URL: {}", client.base_url);

    // RESOURCE TESTS
    println!("\n🏥 Resource Tests");

    results
        .expect_status(
            "Available Resources",
            client.get("/resources/available?dateTime=2031-03-03T09:00:00Z").await,
            StatusCode::OK,
        )
        .await;

    // APPOINTMENT TESTS
    println!("\n📅 Appointment Tests");

    let created = results
        .expect_status(
            "Request Appointment",
            client
                .post(
                    "/appointments",
                    appointment_body(patient_id, doctor_id, "2031-03-03T09:00:00Z"),
                )
                .await,
            StatusCode::CREATED,
        )
        .await;

    let conflict = results
        .expect_status(
            "Doctor Double Booking Rejected",
            client
                .post(
                    "/appointments",
                    appointment_body(Uuid::new_v4(), doctor_id, "2031-03-03T09:00:00Z"),
                )
                .await,
            StatusCode::CONFLICT,
        )
        .await;
    if let Some(body) = conflict {
        if body["code"] != "appointment.doctor.unavailable" {
            results.fail("Conflict Error Code", &format!("Got {}", body["code"]));
        }
    }

    results
        .expect_status(
            "Unknown Appointment",
            client.get(&format!("/appointments/{}", Uuid::new_v4())).await,
            StatusCode::NOT_FOUND,
        )
        .await;

    let Some(appointment_id) = created
        .as_ref()
        .and_then(|body| body["id"].as_str())
        .map(str::to_string)
    else {
        results.skip("Appointment Lifecycle", "No appointment id from creation");
        return Ok(results);
    };

    let decided = results
        .expect_status(
            "Accept Appointment",
            client
                .put(
                    &format!("/appointments/{}/decision", appointment_id),
                    json!({ "action": "accept", "facilityId": CONSULTATION_ROOM_A }),
                )
                .await,
            StatusCode::OK,
        )
        .await;
    if let Some(body) = decided {
        // Workflow deployments confirm later.
        println!("   status after accept: {}", body["status"]);
    }

    results
        .expect_status(
            "Doctor Schedule",
            client.get(&format!("/appointments/doctors/{}", doctor_id)).await,
            StatusCode::OK,
        )
        .await;

    results
        .expect_status(
            "Cancel Appointment",
            client
                .post(
                    &format!("/appointments/{}/cancel", appointment_id),
                    json!({ "by": "patient", "reason": "Feeling better" }),
                )
                .await,
            StatusCode::NO_CONTENT,
        )
        .await;

    results
        .expect_status(
            "Cancel Appointment Again",
            client
                .post(
                    &format!("/appointments/{}/cancel", appointment_id),
                    json!({ "by": "patient" }),
                )
                .await,
            StatusCode::NO_CONTENT,
        )
        .await;

    results
        .expect_status(
            "Decision On Cancelled Appointment",
            client
                .put(
                    &format!("/appointments/{}/decision", appointment_id),
                    json!({ "action": "reject", "reason": "Too late" }),
                )
                .await,
            StatusCode::CONFLICT,
        )
        .await;

    let held = results
        .expect_status(
            "Reservations Released",
            client
                .get(&format!("/resources/{}/reservations", appointment_id))
                .await,
            StatusCode::OK,
        )
        .await;
    if let Some(held) = held {
        if held.as_array().map(Vec::len).unwrap_or(0) != 0 {
            results.fail("Reservations Released", "Reservations still held after cancel");
        }
    }

    Ok(results)
}

/// Entry point for endpoint tests
#[tokio::main]
async fn main() -> Result<(), TestError> {
    let results = run_endpoint_tests().await?;
    results.summary();

    if results.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a running booking API"]
    async fn test_endpoint_integration() {
        let results = run_endpoint_tests().await.expect("Test execution failed");
        assert_eq!(results.failed, 0, "failures: {:?}", results.failures);
    }

    #[test]
    fn appointment_body_uses_wire_names() {
        let body = appointment_body(Uuid::nil(), Uuid::nil(), "2031-03-03T09:00:00Z");
        assert_eq!(body["type"], "consultation");
        assert!(body.get("appointmentDateTime").is_some());
    }
}
