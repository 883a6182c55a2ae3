use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::BookingEventsError;
use crate::models::EventEnvelope;

/// At-least-once topic transport between the appointment and resource sides.
///
/// A received envelope stays in flight until it is acknowledged, handed back for
/// redelivery, or parked on the topic's dead-letter list.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), BookingEventsError>;

    /// Waits up to `timeout` for the next envelope on `topic`.
    async fn receive(
        &self,
        topic: &str,
        timeout: Duration,
    ) -> Result<Option<EventEnvelope>, BookingEventsError>;

    async fn ack(&self, envelope: &EventEnvelope) -> Result<(), BookingEventsError>;

    /// Requeues the envelope with its delivery attempt incremented.
    async fn retry(&self, envelope: EventEnvelope, error: &str) -> Result<(), BookingEventsError>;

    async fn dead_letter(
        &self,
        envelope: EventEnvelope,
        error: &str,
    ) -> Result<(), BookingEventsError>;
}

#[derive(Default)]
struct TopicQueues {
    pending: VecDeque<EventEnvelope>,
    processing: Vec<EventEnvelope>,
    dead_letter: Vec<EventEnvelope>,
}

/// Single-process bus for embedded deployments and tests.
#[derive(Default)]
pub struct InMemoryEventBus {
    topics: Mutex<HashMap<String, TopicQueues>>,
}

const POLL_INTERVAL: Duration = Duration::from_millis(20);

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    async fn take(&self, topic: &str) -> Option<EventEnvelope> {
        let mut topics = self.topics.lock().await;
        let queues = topics.get_mut(topic)?;
        let mut envelope = queues.pending.pop_front()?;
        envelope.receipt = Some(envelope.event_id.to_string());
        queues.processing.push(envelope.clone());
        Some(envelope)
    }

    async fn remove_in_flight(&self, envelope: &EventEnvelope) -> bool {
        let mut topics = self.topics.lock().await;
        match topics.get_mut(&envelope.topic) {
            Some(queues) => {
                let before = queues.processing.len();
                queues.processing.retain(|e| e.event_id != envelope.event_id);
                before != queues.processing.len()
            }
            None => false,
        }
    }

    pub async fn pending(&self, topic: &str) -> Vec<EventEnvelope> {
        self.topics
            .lock()
            .await
            .get(topic)
            .map(|q| q.pending.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn in_flight(&self, topic: &str) -> Vec<EventEnvelope> {
        self.topics
            .lock()
            .await
            .get(topic)
            .map(|q| q.processing.clone())
            .unwrap_or_default()
    }

    pub async fn dead_letters(&self, topic: &str) -> Vec<EventEnvelope> {
        self.topics
            .lock()
            .await
            .get(topic)
            .map(|q| q.dead_letter.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), BookingEventsError> {
        debug!("Publishing {} to {}", envelope.event_id, envelope.topic);
        self.topics
            .lock()
            .await
            .entry(envelope.topic.clone())
            .or_default()
            .pending
            .push_back(envelope);
        Ok(())
    }

    async fn receive(
        &self,
        topic: &str,
        timeout: Duration,
    ) -> Result<Option<EventEnvelope>, BookingEventsError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(envelope) = self.take(topic).await {
                return Ok(Some(envelope));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn ack(&self, envelope: &EventEnvelope) -> Result<(), BookingEventsError> {
        if !self.remove_in_flight(envelope).await {
            warn!("Ack for {} which is not in flight", envelope.event_id);
        }
        Ok(())
    }

    async fn retry(&self, envelope: EventEnvelope, error: &str) -> Result<(), BookingEventsError> {
        self.remove_in_flight(&envelope).await;
        self.publish(envelope.redelivery(error)).await
    }

    async fn dead_letter(
        &self,
        envelope: EventEnvelope,
        error: &str,
    ) -> Result<(), BookingEventsError> {
        self.remove_in_flight(&envelope).await;
        let mut parked = envelope;
        parked.last_error = Some(error.to_string());
        parked.receipt = None;

        warn!("Dead-lettering {} on {}: {}", parked.event_id, parked.topic, error);
        self.topics
            .lock()
            .await
            .entry(parked.topic.clone())
            .or_default()
            .dead_letter
            .push(parked);
        Ok(())
    }
}
