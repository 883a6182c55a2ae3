use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, error, info, warn};

use crate::error::BookingEventsError;
use crate::models::EventEnvelope;
use crate::services::bus::EventBus;

/// Redis reliable-queue transport.
///
/// `events:{topic}` holds pending envelopes; a receive moves one atomically into
/// `events:{topic}:processing` where it stays until acknowledged. Parked envelopes go to
/// `events:{topic}:dead-letter`.
pub struct RedisEventBus {
    pool: Pool,
}

fn pending_key(topic: &str) -> String {
    format!("events:{}", topic)
}

fn processing_key(topic: &str) -> String {
    format!("events:{}:processing", topic)
}

fn dead_letter_key(topic: &str) -> String {
    format!("events:{}:dead-letter", topic)
}

impl RedisEventBus {
    pub async fn new(redis_url: &str) -> Result<Self, BookingEventsError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| BookingEventsError::PoolError(format!("Pool creation error: {}", e)))?;

        // Test connection
        let mut conn = pool
            .get()
            .await
            .map_err(|e| BookingEventsError::PoolError(format!("Connection error: {}", e)))?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis event bus initialized successfully");

        Ok(Self { pool })
    }

    async fn get_connection(&self) -> Result<Connection, BookingEventsError> {
        self.pool
            .get()
            .await
            .map_err(|e| BookingEventsError::PoolError(e.to_string()))
    }

    async fn remove_in_flight(
        &self,
        conn: &mut Connection,
        envelope: &EventEnvelope,
    ) -> Result<(), BookingEventsError> {
        match &envelope.receipt {
            Some(raw) => {
                let removed: i64 = conn.lrem(processing_key(&envelope.topic), 1, raw).await?;
                if removed == 0 {
                    warn!("Envelope {} was no longer in flight", envelope.event_id);
                }
            }
            None => warn!("Envelope {} carries no receipt", envelope.event_id),
        }
        Ok(())
    }
}

#[async_trait]
impl EventBus for RedisEventBus {
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), BookingEventsError> {
        let mut conn = self.get_connection().await?;
        let data = serde_json::to_string(&envelope)?;

        let _: () = conn
            .lpush(pending_key(&envelope.topic), data)
            .await
            .map_err(|e| BookingEventsError::PublishError {
                topic: envelope.topic.clone(),
                reason: e.to_string(),
            })?;

        debug!("Event {} published to {}", envelope.event_id, envelope.topic);
        Ok(())
    }

    async fn receive(
        &self,
        topic: &str,
        timeout: Duration,
    ) -> Result<Option<EventEnvelope>, BookingEventsError> {
        let mut conn = self.get_connection().await?;

        // A zero timeout would block forever.
        let wait = timeout.as_secs_f64().max(0.01);
        let raw: Option<String> = conn
            .brpoplpush(pending_key(topic), processing_key(topic), wait)
            .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str::<EventEnvelope>(&raw) {
            Ok(mut envelope) => {
                envelope.receipt = Some(raw);
                Ok(Some(envelope))
            }
            Err(e) => {
                error!("Undecodable envelope on {}: {}", topic, e);
                let _: i64 = conn.lrem(processing_key(topic), 1, &raw).await?;
                let _: () = conn.lpush(dead_letter_key(topic), &raw).await?;
                Ok(None)
            }
        }
    }

    async fn ack(&self, envelope: &EventEnvelope) -> Result<(), BookingEventsError> {
        let mut conn = self.get_connection().await?;
        self.remove_in_flight(&mut conn, envelope).await
    }

    async fn retry(&self, envelope: EventEnvelope, error: &str) -> Result<(), BookingEventsError> {
        let mut conn = self.get_connection().await?;
        self.remove_in_flight(&mut conn, &envelope).await?;

        let topic = envelope.topic.clone();
        let redelivered = envelope.redelivery(error);
        let data = serde_json::to_string(&redelivered)?;
        let _: () = conn.lpush(pending_key(&topic), data).await?;

        debug!(
            "Event {} requeued on {} (attempt {})",
            redelivered.event_id, topic, redelivered.delivery_attempt
        );
        Ok(())
    }

    async fn dead_letter(
        &self,
        envelope: EventEnvelope,
        error: &str,
    ) -> Result<(), BookingEventsError> {
        let mut conn = self.get_connection().await?;
        self.remove_in_flight(&mut conn, &envelope).await?;

        let mut parked = envelope;
        parked.last_error = Some(error.to_string());
        let data = serde_json::to_string(&parked)?;
        let _: () = conn.lpush(dead_letter_key(&parked.topic), data).await?;

        warn!("Event {} dead-lettered on {}: {}", parked.event_id, parked.topic, error);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_the_topic() {
        assert_eq!(pending_key("resource-reserved"), "events:resource-reserved");
        assert_eq!(
            processing_key("resource-reserved"),
            "events:resource-reserved:processing"
        );
        assert_eq!(
            dead_letter_key("resource-reserved"),
            "events:resource-reserved:dead-letter"
        );
    }
}
