//! Subscriber registry

use crate::state::ClassifierUpdate;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with every flushed update
pub type Subscriber = Arc<dyn Fn(&ClassifierUpdate) + Send + Sync>;

/// Opaque handle returned by `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Ordered map from handle to callback
///
/// Handles are issued in increasing order, so iteration follows
/// subscription order.
#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: u64,
    subscribers: BTreeMap<SubscriptionId, Subscriber>,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback
    pub fn insert(&mut self, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.insert(id, subscriber);
        id
    }

    /// Remove a callback; false if the handle was unknown
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    /// Number of registered callbacks
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Check if no callbacks are registered
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Cloned callbacks in subscription order, so they can run unlocked
    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.subscribers.values().cloned().collect()
    }
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("next_id", &self.next_id)
            .field("ids", &self.subscribers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_insertion_order_and_removal() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SubscriberRegistry::new();

        let mut ids = Vec::new();
        for n in 0..3 {
            let seen = Arc::clone(&seen);
            ids.push(registry.insert(Arc::new(move |_: &ClassifierUpdate| seen.lock().push(n))));
        }
        assert!(registry.remove(ids[1]));
        assert!(!registry.remove(ids[1]));
        assert_eq!(registry.len(), 2);

        let update = ClassifierUpdate::default();
        for subscriber in registry.snapshot() {
            subscriber(&update);
        }
        assert_eq!(*seen.lock(), vec![0, 2]);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut registry = SubscriberRegistry::new();
        let first = registry.insert(Arc::new(|_: &ClassifierUpdate| {}));
        registry.remove(first);
        let second = registry.insert(Arc::new(|_: &ClassifierUpdate| {}));
        assert_ne!(first, second);
        assert_eq!(second.to_string(), "sub-1");
    }
}
