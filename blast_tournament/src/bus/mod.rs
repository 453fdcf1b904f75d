//! Message bus abstraction.
//!
//! Publishing is synchronous and never waits for a consumer: a message is
//! either enqueued or rejected immediately. Consumers run one sequential loop
//! per topic ([`run_consumer`]) and must tolerate redelivery.

use serde::Serialize;

pub mod channel;
pub mod consumer;
pub mod errors;
pub mod events;

pub use channel::{ChannelBus, DEFAULT_TOPIC_CAPACITY, Envelope};
pub use consumer::{ConsumerStats, EventHandler, run_consumer};
pub use errors::{BusError, BusResult};
pub use events::{EntryRequested, LeaderboardScoreUpdated, ProgressUpdated};

/// Fire-and-forget publisher
pub trait MessageBus: Send + Sync {
    /// Enqueue `payload` on `topic` without waiting for delivery
    fn publish(&self, topic: &str, payload: Vec<u8>) -> BusResult<()>;
}

/// Serialize `event` as JSON and publish it
pub fn publish_event<E>(bus: &(impl MessageBus + ?Sized), topic: &str, event: &E) -> BusResult<()>
where
    E: Serialize,
{
    let payload = serde_json::to_vec(event)?;
    bus.publish(topic, payload)
}
