//! Pub/sub fan-out for change feed events. Channels are named by record type.

use crate::operation::Operation;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

pub const DEFAULT_BUFFER_SIZE: usize = 256;

/// One operation of a committed transform, as published to subscribers of its record type.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEvent {
    pub record_type: String,
    pub transform: String,
    pub operation: Operation,
}

pub trait PubSub: Send + Sync {
    /// Returns the number of subscribers that received the event.
    fn publish(&self, channel: &str, event: FeedEvent) -> usize;

    fn subscribe(&self, channel: &str) -> broadcast::Receiver<FeedEvent>;
}

/// In-process pub/sub over one `broadcast` channel per name, created on first subscribe.
pub struct MemoryPubSub {
    channels: RwLock<HashMap<String, broadcast::Sender<FeedEvent>>>,
    buffer_size: usize,
}

impl MemoryPubSub {
    pub fn new(buffer_size: usize) -> Self {
        MemoryPubSub {
            channels: RwLock::new(HashMap::new()),
            buffer_size,
        }
    }
}

impl Default for MemoryPubSub {
    fn default() -> Self {
        MemoryPubSub::new(DEFAULT_BUFFER_SIZE)
    }
}

impl PubSub for MemoryPubSub {
    fn publish(&self, channel: &str, event: FeedEvent) -> usize {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        match channels.get(channel) {
            // send fails only when every receiver is gone
            Some(tx) => tx.send(event).unwrap_or(0),
            None => 0,
        }
    }

    fn subscribe(&self, channel: &str) -> broadcast::Receiver<FeedEvent> {
        let mut channels = self.channels.write().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer_size).0)
            .subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Identity;

    fn event(record_type: &str) -> FeedEvent {
        FeedEvent {
            record_type: record_type.to_string(),
            transform: "t1".into(),
            operation: Operation::RemoveRecord {
                record: Identity::new(record_type, "1"),
            },
        }
    }

    #[tokio::test]
    async fn delivers_only_to_matching_channel() {
        let pubsub = MemoryPubSub::default();
        assert_eq!(pubsub.publish("planet", event("planet")), 0);
        let mut planets = pubsub.subscribe("planet");
        let mut moons = pubsub.subscribe("moon");
        assert_eq!(pubsub.publish("planet", event("planet")), 1);
        assert_eq!(planets.recv().await.unwrap().record_type, "planet");
        assert!(moons.try_recv().is_err());
    }

    #[test]
    fn event_serializes_camel_case() {
        let json = serde_json::to_value(event("planet")).unwrap();
        assert_eq!(json["recordType"], "planet");
        assert_eq!(json["operation"]["op"], "removeRecord");
    }
}
