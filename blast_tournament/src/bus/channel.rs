//! In-process bus: one bounded tokio channel per topic.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{
    MessageBus,
    errors::{BusError, BusResult},
};

/// Default per-topic queue capacity
pub const DEFAULT_TOPIC_CAPACITY: usize = 1024;

/// A published message as seen by the consumer
#[derive(Debug, Clone)]
pub struct Envelope {
    pub id: Uuid,
    pub topic: String,
    pub payload: Vec<u8>,
    pub published_at: DateTime<Utc>,
}

struct Topic {
    sender: mpsc::Sender<Envelope>,
    /// Taken by the single subscriber
    receiver: Option<mpsc::Receiver<Envelope>>,
}

#[derive(Default)]
struct Topics {
    by_name: HashMap<String, Topic>,
    closed: bool,
}

/// In-process bus with consumer-group semantics: each topic has exactly one
/// subscriber and messages published before it subscribes are retained up to
/// the queue capacity.
pub struct ChannelBus {
    topics: Mutex<Topics>,
    capacity: usize,
}

impl Default for ChannelBus {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_CAPACITY)
    }
}

impl ChannelBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Mutex::new(Topics::default()),
            capacity: capacity.max(1),
        }
    }

    fn topic<'a>(topics: &'a mut Topics, name: &str, capacity: usize) -> &'a mut Topic {
        topics.by_name.entry(name.to_string()).or_insert_with(|| {
            let (sender, receiver) = mpsc::channel(capacity);
            Topic {
                sender,
                receiver: Some(receiver),
            }
        })
    }

    /// Take the receiving end of a topic
    pub fn subscribe(&self, topic: &str) -> BusResult<mpsc::Receiver<Envelope>> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        if topics.closed {
            return Err(BusError::TopicClosed(topic.to_string()));
        }
        Self::topic(&mut topics, topic, self.capacity)
            .receiver
            .take()
            .ok_or_else(|| BusError::AlreadySubscribed(topic.to_string()))
    }

    /// Drop every sender so consumer loops drain their queues and exit
    pub fn close(&self) {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics.closed = true;
        topics.by_name.clear();
        log::info!("Message bus closed");
    }
}

impl MessageBus for ChannelBus {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> BusResult<()> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        if topics.closed {
            return Err(BusError::TopicClosed(topic.to_string()));
        }

        let envelope = Envelope {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            payload,
            published_at: Utc::now(),
        };

        Self::topic(&mut topics, topic, self.capacity)
            .sender
            .try_send(envelope)
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => BusError::QueueFull(topic.to_string()),
                mpsc::error::TrySendError::Closed(_) => BusError::TopicClosed(topic.to_string()),
            })
    }
}
