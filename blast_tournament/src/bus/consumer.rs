//! Sequential per-topic consumer loop.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::channel::Envelope;

/// Handles decoded events of one topic
#[async_trait]
pub trait EventHandler: Send + Sync {
    type Event: DeserializeOwned + Send;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn handle(&self, event: Self::Event) -> Result<(), Self::Error>;
}

/// Counters returned when a consumer loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub received: u64,
    pub handled: u64,
    pub decode_failures: u64,
    pub handler_failures: u64,
}

/// Consume a topic until its queue closes.
///
/// Messages are handled one at a time in arrival order. Decode and handler
/// errors are logged and the message is dropped.
pub async fn run_consumer<H>(
    topic: String,
    mut receiver: mpsc::Receiver<Envelope>,
    handler: Arc<H>,
) -> ConsumerStats
where
    H: EventHandler + ?Sized,
{
    let mut stats = ConsumerStats::default();
    log::info!("Consumer started for topic {}", topic);

    while let Some(envelope) = receiver.recv().await {
        stats.received += 1;

        let event = match serde_json::from_slice::<H::Event>(&envelope.payload) {
            Ok(event) => event,
            Err(e) => {
                stats.decode_failures += 1;
                log::error!(
                    "Failed to decode message {} on {}: {}",
                    envelope.id,
                    topic,
                    e
                );
                continue;
            }
        };

        match handler.handle(event).await {
            Ok(()) => stats.handled += 1,
            Err(e) => {
                stats.handler_failures += 1;
                log::error!(
                    "Failed to process message {} on {}: {}",
                    envelope.id,
                    topic,
                    e
                );
            }
        }
    }

    log::info!(
        "Consumer for topic {} stopped after {} messages",
        topic,
        stats.received
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{ChannelBus, MessageBus, events::EntryRequested, publish_event};
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("rejected user {0}")]
    struct Rejected(i64);

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        type Event = EntryRequested;
        type Error = Rejected;

        async fn handle(&self, event: EntryRequested) -> Result<(), Rejected> {
            if event.user_id < 0 {
                return Err(Rejected(event.user_id));
            }
            self.seen.lock().unwrap().push(event.user_id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_consumer_handles_in_order_and_survives_failures() {
        let bus = ChannelBus::default();
        let rx = bus.subscribe("entries").unwrap();

        publish_event(&bus, "entries", &EntryRequested { user_id: 1 }).unwrap();
        bus.publish("entries", b"not json".to_vec()).unwrap();
        publish_event(&bus, "entries", &EntryRequested { user_id: -5 }).unwrap();
        publish_event(&bus, "entries", &EntryRequested { user_id: 2 }).unwrap();
        bus.close();

        let recorder = Arc::new(Recorder::default());
        let stats = run_consumer("entries".to_string(), rx, recorder.clone()).await;

        assert_eq!(*recorder.seen.lock().unwrap(), vec![1, 2]);
        assert_eq!(
            stats,
            ConsumerStats {
                received: 4,
                handled: 2,
                decode_failures: 1,
                handler_failures: 1,
            }
        );
    }
}
