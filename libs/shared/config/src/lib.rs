use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How an accepted appointment coordinates with the resource service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStrategy {
    /// Reserve inline while the decision request is held open.
    Sync,
    /// Publish `appointment-scheduled` and let a consumer reserve.
    Event,
    /// Start a workflow process and let the external task worker reserve.
    Workflow,
}

impl fmt::Display for BookingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStrategy::Sync => write!(f, "sync"),
            BookingStrategy::Event => write!(f, "event"),
            BookingStrategy::Workflow => write!(f, "workflow"),
        }
    }
}

impl FromStr for BookingStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sync" | "synchronous" => Ok(BookingStrategy::Sync),
            "event" | "events" | "kafka" => Ok(BookingStrategy::Event),
            "workflow" | "camunda" => Ok(BookingStrategy::Workflow),
            other => Err(format!("unknown booking strategy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub booking_strategy: BookingStrategy,
    pub resource_service_url: Option<String>,
    pub appointment_service_url: String,
    pub directory_service_url: Option<String>,
    pub redis_url: Option<String>,
    pub workflow_engine_url: String,
    pub workflow_process_key: String,
    pub workflow_worker_id: String,
    pub http_timeout_seconds: u64,
    pub event_max_delivery_attempts: u32,
    pub run_embedded_consumers: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            booking_strategy: BookingStrategy::Sync,
            resource_service_url: None,
            appointment_service_url: "http://localhost:3000".to_string(),
            directory_service_url: None,
            redis_url: None,
            workflow_engine_url: "http://camunda-platform:8080/engine-rest".to_string(),
            workflow_process_key: "appointment-reservation".to_string(),
            workflow_worker_id: "resource-reservation-worker".to_string(),
            http_timeout_seconds: 15,
            event_max_delivery_attempts: 3,
            run_embedded_consumers: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            host: env::var("APP_HOST").unwrap_or_else(|_| {
                warn!("APP_HOST not set, using default");
                defaults.host.clone()
            }),
            port: parse_var("APP_PORT", defaults.port),
            booking_strategy: parse_var("BOOKING_STRATEGY", defaults.booking_strategy),
            resource_service_url: optional_url("RESOURCE_SERVICE_URL"),
            appointment_service_url: env::var("APPOINTMENT_SERVICE_URL").unwrap_or_else(|_| {
                warn!("APPOINTMENT_SERVICE_URL not set, using default");
                defaults.appointment_service_url.clone()
            }),
            directory_service_url: optional_url("DIRECTORY_SERVICE_URL"),
            redis_url: optional_url("REDIS_URL"),
            workflow_engine_url: env::var("WORKFLOW_ENGINE_URL").unwrap_or_else(|_| {
                warn!("WORKFLOW_ENGINE_URL not set, using default");
                defaults.workflow_engine_url.clone()
            }),
            workflow_process_key: env::var("WORKFLOW_PROCESS_KEY").unwrap_or_else(|_| {
                warn!("WORKFLOW_PROCESS_KEY not set, using default");
                defaults.workflow_process_key.clone()
            }),
            workflow_worker_id: env::var("WORKFLOW_WORKER_ID").unwrap_or_else(|_| {
                warn!("WORKFLOW_WORKER_ID not set, using default");
                defaults.workflow_worker_id.clone()
            }),
            http_timeout_seconds: parse_var("HTTP_TIMEOUT_SECONDS", defaults.http_timeout_seconds),
            event_max_delivery_attempts: parse_var(
                "EVENT_MAX_DELIVERY_ATTEMPTS",
                defaults.event_max_delivery_attempts,
            ),
            run_embedded_consumers: parse_var(
                "RUN_EMBEDDED_CONSUMERS",
                defaults.run_embedded_consumers,
            ),
        };

        if config.booking_strategy == BookingStrategy::Event && config.redis_url.is_none() {
            warn!("Event strategy without REDIS_URL - events stay inside this process");
        }

        config
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    /// True when reservations are served by a separate resource service.
    pub fn has_remote_resource_service(&self) -> bool {
        self.resource_service_url.is_some()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn optional_url(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim_end_matches('/').to_string()),
        _ => {
            warn!("{} not set", key);
            None
        }
    }
}

fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr + fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {}", key, default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strategy_aliases() {
        assert_eq!("sync".parse::<BookingStrategy>(), Ok(BookingStrategy::Sync));
        assert_eq!("Kafka".parse::<BookingStrategy>(), Ok(BookingStrategy::Event));
        assert_eq!(" workflow ".parse::<BookingStrategy>(), Ok(BookingStrategy::Workflow));
        assert!("carrier-pigeon".parse::<BookingStrategy>().is_err());
    }

    #[test]
    fn defaults_match_worker_constants() {
        let config = AppConfig::default();
        assert_eq!(config.workflow_worker_id, "resource-reservation-worker");
        assert_eq!(config.http_timeout(), Duration::from_secs(15));
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert!(!config.has_remote_resource_service());
    }
}
