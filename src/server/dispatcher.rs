//! Broadcast dispatcher
//!
//! The producer-facing side of the server. A push caches the payload,
//! snapshots the registry and queues one data frame for every subscriber,
//! evicting any that cannot take it. Queueing never waits: a subscriber whose
//! queue is full is dropped and will catch up via replay when it reconnects.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::protocol::Frame;
use crate::registry::{LastValueCache, Subscriber, SubscriberRegistry};
use crate::server::config::ReplayPolicy;
use crate::stats::ServerStats;

/// Outcome of a single push
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushReport {
    /// Subscribers that received the frame
    pub delivered: usize,
    /// Subscribers evicted because the frame could not be queued
    pub evicted: usize,
}

/// Fans payloads out to the registry
pub struct Dispatcher {
    registry: Arc<SubscriberRegistry>,
    cache: Arc<LastValueCache>,
    stats: Arc<ServerStats>,
    replay_policy: ReplayPolicy,
    /// Serializes pushes with each other, with late-joiner attach and with close
    order: Mutex<()>,
    closed: AtomicBool,
}

impl Dispatcher {
    /// Create a dispatcher over shared registry, cache and counters
    pub fn new(
        registry: Arc<SubscriberRegistry>,
        cache: Arc<LastValueCache>,
        stats: Arc<ServerStats>,
        replay_policy: ReplayPolicy,
    ) -> Self {
        Self {
            registry,
            cache,
            stats,
            replay_policy,
            order: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    /// Get a reference to the subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Get a reference to the last-value cache
    pub fn cache(&self) -> &Arc<LastValueCache> {
        &self.cache
    }

    /// Whether [`close`](Self::close) has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Broadcast a payload to every registered subscriber
    ///
    /// The payload is cached first so that anyone attaching afterwards gets
    /// it as replay. Per-subscriber failures are absorbed.
    pub async fn push(&self, payload: impl Into<String>) -> PushReport {
        let payload = Arc::new(payload.into());

        let _order = self.order.lock().await;
        self.cache.set(Arc::clone(&payload));

        let subscribers = self.registry.snapshot().await;
        let mut report = PushReport::default();

        for subscriber in &subscribers {
            match subscriber.send(Frame::Data(Arc::clone(&payload))) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    if self.registry.evict(subscriber, &e).await {
                        self.stats.record_evicted();
                    }
                    report.evicted += 1;
                }
            }
        }

        self.stats.record_push(report.delivered as u64);

        tracing::debug!(
            delivered = report.delivered,
            evicted = report.evicted,
            "Update pushed to subscribers"
        );

        report
    }

    /// Bring a newly accepted subscriber up to date and register it
    ///
    /// Runs under the same lock as `push`, so the subscriber sees exactly one
    /// copy of the current value followed by every later push. Fails with
    /// [`Error::ShutDown`] once the dispatcher is closed; if the replay cannot
    /// be queued the subscriber is closed and never registered.
    pub async fn attach(&self, subscriber: Arc<Subscriber>) -> Result<u64> {
        let _order = self.order.lock().await;

        if self.is_closed() {
            subscriber.close();
            return Err(Error::ShutDown);
        }

        if self.replay_policy == ReplayPolicy::LastValue {
            if let Some(payload) = self.cache.get() {
                if let Err(e) = subscriber.send(Frame::Data(payload)) {
                    subscriber.close();
                    return Err(e.into());
                }
                self.stats.record_replay();
                tracing::debug!(
                    subscriber_id = subscriber.id(),
                    "Queued cached payload for new subscriber"
                );
            }
        }

        subscriber.mark_streaming();
        Ok(self.registry.insert(subscriber).await)
    }

    /// Refuse further subscribers and close every registered one
    ///
    /// Returns how many were closed. Pushes still update the cache.
    pub async fn close(&self) -> usize {
        let _order = self.order.lock().await;
        self.closed.store(true, Ordering::Release);

        let subscribers = self.registry.drain().await;
        for subscriber in &subscribers {
            subscriber.close();
        }
        subscribers.len()
    }
}
