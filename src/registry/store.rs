//! Subscriber registry implementation
//!
//! The live set of subscribers that receive broadcasts and heartbeats.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::entry::Subscriber;
use crate::error::DeliveryError;

/// Registry of active subscribers keyed by ID
///
/// Thread-safe via `RwLock`. Iteration always goes through [`snapshot`],
/// which copies the handles out so the lock is never held while frames are
/// being queued.
///
/// [`snapshot`]: SubscriberRegistry::snapshot
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<HashMap<u64, Arc<Subscriber>>>,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber, returning its ID
    pub async fn insert(&self, subscriber: Arc<Subscriber>) -> u64 {
        let id = subscriber.id();
        let total = {
            let mut subscribers = self.subscribers.write().await;
            subscribers.insert(id, subscriber);
            subscribers.len()
        };

        tracing::info!(subscriber_id = id, total = total, "Subscriber added");
        id
    }

    /// Remove a subscriber by ID
    ///
    /// Returns `false` if it was not present; removing twice is harmless.
    pub async fn remove(&self, id: u64) -> bool {
        self.subscribers.write().await.remove(&id).is_some()
    }

    /// Look up a subscriber
    pub async fn get(&self, id: u64) -> Option<Arc<Subscriber>> {
        self.subscribers.read().await.get(&id).cloned()
    }

    /// Point-in-time copy of all registered subscribers, ordered by ID
    pub async fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        let mut subscribers: Vec<_> = self.subscribers.read().await.values().cloned().collect();
        subscribers.sort_unstable_by_key(|s| s.id());
        subscribers
    }

    /// Remove and return every subscriber
    pub async fn drain(&self) -> Vec<Arc<Subscriber>> {
        let mut subscribers: Vec<_> = self
            .subscribers
            .write()
            .await
            .drain()
            .map(|(_, s)| s)
            .collect();
        subscribers.sort_unstable_by_key(|s| s.id());
        subscribers
    }

    /// Number of registered subscribers
    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Whether no subscribers are registered
    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }

    /// Remove a subscriber that could not take a frame and close its queue
    ///
    /// Safe to race: broadcaster and keep-alive may both evict the same
    /// subscriber. Returns `true` for the caller that removed it.
    pub async fn evict(&self, subscriber: &Subscriber, reason: &DeliveryError) -> bool {
        let removed = self.remove(subscriber.id()).await;
        subscriber.close();

        if removed {
            let remaining = self.len().await;
            tracing::warn!(
                subscriber_id = subscriber.id(),
                peer = ?subscriber.peer_addr(),
                error = %reason,
                remaining = remaining,
                "Removed unresponsive subscriber"
            );
        }

        removed
    }

    /// Take the write lock and keep it until the guard is dropped
    #[cfg(test)]
    pub(crate) async fn hold_for_test(
        &self,
    ) -> tokio::sync::RwLockWriteGuard<'_, HashMap<u64, Arc<Subscriber>>> {
        self.subscribers.write().await
    }
}
