use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use resource_cell::ResourceReservationClient;
use shared_models::error::codes;
use shared_models::resource::{ReleaseScope, ReservedResources};

use crate::error::BookingEventsError;
use crate::models::{
    AppointmentScheduledEvent, ConsumerConfig, EventEnvelope, ReservationFailedEvent,
    APPOINTMENT_SCHEDULED, RESOURCE_RESERVATION_FAILED, RESOURCE_RESERVED,
};
use crate::services::bus::EventBus;

/// What happened to one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Acknowledged,
    Retried { attempt: u32 },
    DeadLettered { reason: String },
}

/// Resource side of the event strategy: turns `appointment-scheduled` into reservations.
pub struct ReservationConsumerService {
    bus: Arc<dyn EventBus>,
    resources: Arc<dyn ResourceReservationClient>,
    config: ConsumerConfig,
    is_shutdown: RwLock<bool>,
}

impl ReservationConsumerService {
    pub fn new(
        bus: Arc<dyn EventBus>,
        resources: Arc<dyn ResourceReservationClient>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            bus,
            resources,
            config,
            is_shutdown: RwLock::new(false),
        }
    }

    #[instrument(skip(self), fields(consumer_id = %self.config.consumer_id))]
    pub async fn start(&self) -> Result<(), BookingEventsError> {
        info!("Reservation consumer listening on {}", APPOINTMENT_SCHEDULED);

        loop {
            if *self.is_shutdown.read().await {
                debug!("Reservation consumer received shutdown signal");
                break;
            }

            match self.process_next().await {
                Ok(Some(outcome)) => debug!("Delivery handled: {:?}", outcome),
                Ok(None) => tokio::time::sleep(Duration::from_millis(100)).await,
                Err(e) => {
                    error!("Reservation consumer failed: {}", e);
                    tokio::time::sleep(Duration::from_millis(self.config.error_backoff_ms)).await;
                }
            }
        }

        info!("Reservation consumer stopped");
        Ok(())
    }

    pub async fn shutdown(&self) {
        *self.is_shutdown.write().await = true;
    }

    /// Handles at most one delivery. `None` when nothing arrived within the poll timeout.
    pub async fn process_next(&self) -> Result<Option<DeliveryOutcome>, BookingEventsError> {
        let timeout = Duration::from_millis(self.config.poll_timeout_ms);
        match self.bus.receive(APPOINTMENT_SCHEDULED, timeout).await? {
            Some(envelope) => self.handle(envelope).await.map(Some),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, envelope), fields(event_id = %envelope.event_id, attempt = envelope.delivery_attempt))]
    async fn handle(&self, envelope: EventEnvelope) -> Result<DeliveryOutcome, BookingEventsError> {
        let event: AppointmentScheduledEvent = match envelope.decode() {
            Ok(event) => event,
            Err(e) => {
                let reason = e.to_string();
                self.bus.dead_letter(envelope, &reason).await?;
                return Ok(DeliveryOutcome::DeadLettered { reason });
            }
        };

        let attempt = envelope.delivery_attempt;
        let request = event.reservation_request();

        match self.resources.reserve(event.appointment_id, &request).await {
            Ok(reserved) => {
                let reply = EventEnvelope::new(RESOURCE_RESERVED, event.appointment_id, &reserved)?;
                if let Err(e) = self.bus.publish(reply).await {
                    warn!("Publishing {} failed: {}", RESOURCE_RESERVED, e);
                    return self
                        .retry_publish_or_park(envelope, &event, &reserved, &e.to_string())
                        .await;
                }
                self.bus.ack(&envelope).await?;
                info!("Resources reserved for appointment {}", event.appointment_id);
                Ok(DeliveryOutcome::Acknowledged)
            }
            Err(e) if e.is_transient() && attempt < self.config.max_delivery_attempts => {
                warn!(
                    "Transient failure reserving for appointment {} (attempt {}): {}",
                    event.appointment_id, attempt, e
                );
                self.bus.retry(envelope, &e.to_string()).await?;
                Ok(DeliveryOutcome::Retried { attempt: attempt + 1 })
            }
            Err(e) => self.fail(envelope, &event, e.code(), &e.to_string()).await,
        }
    }

    /// The reservation is held but nobody was told. Redelivery re-reserves idempotently;
    /// once attempts run out the reservation is released before reporting failure.
    async fn retry_publish_or_park(
        &self,
        envelope: EventEnvelope,
        event: &AppointmentScheduledEvent,
        reserved: &ReservedResources,
        message: &str,
    ) -> Result<DeliveryOutcome, BookingEventsError> {
        let attempt = envelope.delivery_attempt;
        if attempt < self.config.max_delivery_attempts {
            self.bus.retry(envelope, message).await?;
            return Ok(DeliveryOutcome::Retried { attempt: attempt + 1 });
        }

        let scope = ReleaseScope::of(reserved);
        if let Err(e) = self.resources.release(event.appointment_id, &scope).await {
            error!(
                "Releasing reservations of appointment {} failed: {}",
                event.appointment_id, e
            );
        }
        self.fail(envelope, event, codes::INTERNAL_SERVER_ERROR, message)
            .await
    }

    /// Reports the failure back to the appointment side and parks the delivery.
    async fn fail(
        &self,
        envelope: EventEnvelope,
        event: &AppointmentScheduledEvent,
        code: &str,
        message: &str,
    ) -> Result<DeliveryOutcome, BookingEventsError> {
        warn!(
            "Reservation for appointment {} failed after {} attempt(s): {}",
            event.appointment_id, envelope.delivery_attempt, message
        );

        let failed = ReservationFailedEvent {
            appointment_id: event.appointment_id,
            appointment_date_time: event.appointment_date_time,
            code: code.to_string(),
            message: message.to_string(),
            attempts: envelope.delivery_attempt,
        };
        let notice = EventEnvelope::new(RESOURCE_RESERVATION_FAILED, event.appointment_id, &failed)?;
        if let Err(e) = self.bus.publish(notice).await {
            error!(
                "Could not publish {} for appointment {}: {}",
                RESOURCE_RESERVATION_FAILED, event.appointment_id, e
            );
        }

        self.bus.dead_letter(envelope, message).await?;
        Ok(DeliveryOutcome::DeadLettered {
            reason: message.to_string(),
        })
    }
}
