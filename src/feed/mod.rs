//! Change feed: committed transforms republished per record type.

pub mod bridge;
pub mod pubsub;

pub use bridge::{publish_transform, ChangeFeed};
pub use pubsub::{FeedEvent, MemoryPubSub, PubSub};
