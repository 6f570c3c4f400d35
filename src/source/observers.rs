//! Explicit observer list for completed transforms. Owned by the source; listeners are added on
//! activation and removed on deactivation so nothing leaks across reconnects.

use crate::operation::Transform;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

pub trait TransformListener: Send + Sync {
    fn on_transform(&self, transform: &Transform);
}

impl<F> TransformListener for F
where
    F: Fn(&Transform) + Send + Sync,
{
    fn on_transform(&self, transform: &Transform) {
        self(transform)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct TransformObservers {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn TransformListener>)>>,
}

impl TransformObservers {
    pub fn new() -> Self {
        TransformObservers::default()
    }

    pub fn add(&self, listener: Arc<dyn TransformListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Returns false when the listener was already removed.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut guard = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|(lid, _)| *lid != id);
        guard.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every listener in registration order. The list is snapshotted first so a
    /// listener may add or remove observers without deadlocking.
    pub fn notify(&self, transform: &Transform) {
        let snapshot: Vec<Arc<dyn TransformListener>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in snapshot {
            listener.on_transform(transform);
        }
    }
}
