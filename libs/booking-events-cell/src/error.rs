use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingEventsError {
    #[error("Redis connection error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    PoolError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Publishing to {topic} failed: {reason}")]
    PublishError { topic: String, reason: String },

    #[error("Malformed event payload: {0}")]
    InvalidPayload(String),
}
