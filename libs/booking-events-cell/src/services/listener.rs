use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use appointment_cell::{AppointmentBookingService, AppointmentError};

use crate::error::BookingEventsError;
use crate::models::{
    ConsumerConfig, EventEnvelope, ReservationFailedEvent, ResourceReservedEvent,
    RESOURCE_RESERVATION_FAILED, RESOURCE_RESERVED,
};
use crate::services::bus::EventBus;
use crate::services::consumer::DeliveryOutcome;

/// Appointment side of the event strategy: folds reservation outcomes back into the
/// appointment state machine.
pub struct ReservationOutcomeListener {
    bus: Arc<dyn EventBus>,
    booking: Arc<AppointmentBookingService>,
    config: ConsumerConfig,
    is_shutdown: RwLock<bool>,
}

impl ReservationOutcomeListener {
    pub fn new(
        bus: Arc<dyn EventBus>,
        booking: Arc<AppointmentBookingService>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            bus,
            booking,
            config,
            is_shutdown: RwLock::new(false),
        }
    }

    #[instrument(skip(self), fields(consumer_id = %self.config.consumer_id))]
    pub async fn start(&self) -> Result<(), BookingEventsError> {
        info!(
            "Outcome listener listening on {} and {}",
            RESOURCE_RESERVED, RESOURCE_RESERVATION_FAILED
        );

        loop {
            if *self.is_shutdown.read().await {
                debug!("Outcome listener received shutdown signal");
                break;
            }

            match self.process_next().await {
                Ok(Some(outcome)) => debug!("Delivery handled: {:?}", outcome),
                Ok(None) => tokio::time::sleep(Duration::from_millis(100)).await,
                Err(e) => {
                    error!("Outcome listener failed: {}", e);
                    tokio::time::sleep(Duration::from_millis(self.config.error_backoff_ms)).await;
                }
            }
        }

        info!("Outcome listener stopped");
        Ok(())
    }

    pub async fn shutdown(&self) {
        *self.is_shutdown.write().await = true;
    }

    /// Handles at most one delivery, successes first.
    pub async fn process_next(&self) -> Result<Option<DeliveryOutcome>, BookingEventsError> {
        // Split the poll window between the two topics.
        let timeout = Duration::from_millis((self.config.poll_timeout_ms / 2).max(1));

        if let Some(envelope) = self.bus.receive(RESOURCE_RESERVED, timeout).await? {
            return self.handle_reserved(envelope).await.map(Some);
        }
        if let Some(envelope) = self.bus.receive(RESOURCE_RESERVATION_FAILED, timeout).await? {
            return self.handle_failed(envelope).await.map(Some);
        }
        Ok(None)
    }

    #[instrument(skip(self, envelope), fields(event_id = %envelope.event_id))]
    async fn handle_reserved(
        &self,
        envelope: EventEnvelope,
    ) -> Result<DeliveryOutcome, BookingEventsError> {
        let reserved: ResourceReservedEvent = match envelope.decode() {
            Ok(reserved) => reserved,
            Err(e) => return self.park(envelope, &e.to_string()).await,
        };

        let appointment_id = reserved.appointment_id;
        let result = self
            .booking
            .confirm_reservation(appointment_id, reserved)
            .await
            .map(|_| ());
        self.settle(envelope, appointment_id, result).await
    }

    #[instrument(skip(self, envelope), fields(event_id = %envelope.event_id))]
    async fn handle_failed(
        &self,
        envelope: EventEnvelope,
    ) -> Result<DeliveryOutcome, BookingEventsError> {
        let failed: ReservationFailedEvent = match envelope.decode() {
            Ok(failed) => failed,
            Err(e) => return self.park(envelope, &e.to_string()).await,
        };

        warn!(
            "Reservation for appointment {} failed ({}): {}",
            failed.appointment_id, failed.code, failed.message
        );
        let result = self
            .booking
            .revert_schedule(failed.appointment_id, failed.appointment_date_time)
            .await
            .map(|_| ());
        self.settle(envelope, failed.appointment_id, result).await
    }

    /// Acks unless the failure is transient and attempts remain.
    async fn settle(
        &self,
        envelope: EventEnvelope,
        appointment_id: Uuid,
        result: Result<(), AppointmentError>,
    ) -> Result<DeliveryOutcome, BookingEventsError> {
        match result {
            Ok(()) => {
                self.bus.ack(&envelope).await?;
                Ok(DeliveryOutcome::Acknowledged)
            }
            Err(e) if e.is_transient() => {
                let attempt = envelope.delivery_attempt;
                if attempt < self.config.max_delivery_attempts {
                    self.bus.retry(envelope, &e.to_string()).await?;
                    Ok(DeliveryOutcome::Retried { attempt: attempt + 1 })
                } else {
                    self.park(envelope, &e.to_string()).await
                }
            }
            Err(e) => {
                // The appointment moved on; nothing left to apply.
                warn!("Outcome for appointment {} not applied: {}", appointment_id, e);
                self.bus.ack(&envelope).await?;
                Ok(DeliveryOutcome::Acknowledged)
            }
        }
    }

    async fn park(
        &self,
        envelope: EventEnvelope,
        reason: &str,
    ) -> Result<DeliveryOutcome, BookingEventsError> {
        self.bus.dead_letter(envelope, reason).await?;
        Ok(DeliveryOutcome::DeadLettered {
            reason: reason.to_string(),
        })
    }
}
