//! Bridge from the source's transform observers to the pub/sub.
//!
//! Attach only after the source is activated; detach before it is deactivated.

use crate::error::SourceError;
use crate::feed::pubsub::{FeedEvent, PubSub};
use crate::operation::Transform;
use crate::source::{ListenerId, Source};
use std::sync::{Arc, Mutex, PoisonError};

/// Republish every operation of `transform` on the channel of its record type.
pub fn publish_transform(pubsub: &dyn PubSub, transform: &Transform) {
    for operation in &transform.operations {
        let record_type = operation.record_type().to_string();
        let event = FeedEvent {
            record_type: record_type.clone(),
            transform: transform.id.clone(),
            operation: operation.clone(),
        };
        let delivered = pubsub.publish(&record_type, event);
        if delivered == 0 {
            tracing::debug!(record_type = %record_type, op = operation.name(), "no feed subscribers");
        }
    }
}

pub struct ChangeFeed {
    pubsub: Arc<dyn PubSub>,
    listener: Mutex<Option<ListenerId>>,
}

impl ChangeFeed {
    pub fn new(pubsub: Arc<dyn PubSub>) -> Self {
        ChangeFeed {
            pubsub,
            listener: Mutex::new(None),
        }
    }

    pub fn pubsub(&self) -> &Arc<dyn PubSub> {
        &self.pubsub
    }

    pub fn is_attached(&self) -> bool {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Add the publishing listener to `source`. Attaching twice keeps the first listener.
    pub fn attach(&self, source: &dyn Source) -> Result<(), SourceError> {
        if !source.is_activated() {
            return Err(SourceError::NotActivated);
        }
        let mut listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if listener.is_some() {
            return Ok(());
        }
        let pubsub = self.pubsub.clone();
        let id = source
            .observers()
            .add(Arc::new(move |t: &Transform| publish_transform(pubsub.as_ref(), t)));
        *listener = Some(id);
        tracing::info!("change feed subscribed to source transforms");
        Ok(())
    }

    /// Returns false when nothing was attached.
    pub fn detach(&self, source: &dyn Source) -> bool {
        let Some(id) = self.listener.lock().unwrap_or_else(PoisonError::into_inner).take() else {
            return false;
        };
        let removed = source.observers().remove(id);
        tracing::info!(removed, "change feed unsubscribed from source transforms");
        removed
    }
}
