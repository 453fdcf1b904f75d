//! Message bus error types.

use thiserror::Error;

/// Bus errors
#[derive(Debug, Error)]
pub enum BusError {
    /// The bus was shut down or the subscriber went away
    #[error("Topic closed: {0}")]
    TopicClosed(String),

    /// The topic queue is at capacity; the message was not enqueued
    #[error("Topic queue full: {0}")]
    QueueFull(String),

    /// A topic accepts exactly one subscriber
    #[error("Topic already has a subscriber: {0}")]
    AlreadySubscribed(String),

    /// Payload could not be serialized
    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type for bus operations
pub type BusResult<T> = Result<T, BusError>;
