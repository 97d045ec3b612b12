//! Keep-alive monitor
//!
//! Idle event streams get cut by proxies, and a vanished client is only
//! noticed once something is sent to it. Every `heartbeat_interval` the
//! monitor queues a comment frame for each subscriber; one that cannot take
//! it is evicted exactly as a failed broadcast would be.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::protocol::Frame;
use crate::registry::SubscriberRegistry;
use crate::stats::ServerStats;

/// Outcome of one heartbeat round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatReport {
    /// Subscribers that accepted the heartbeat
    pub sent: usize,
    /// Subscribers evicted because the heartbeat could not be queued
    pub evicted: usize,
}

/// Periodic heartbeat sender
pub struct KeepAliveMonitor {
    registry: Arc<SubscriberRegistry>,
    stats: Arc<ServerStats>,
    interval: Duration,
}

impl KeepAliveMonitor {
    /// Create a monitor; a zero interval is raised to one millisecond
    pub fn new(
        registry: Arc<SubscriberRegistry>,
        stats: Arc<ServerStats>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            stats,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Send one heartbeat to every registered subscriber
    pub async fn tick(&self) -> HeartbeatReport {
        let mut report = HeartbeatReport::default();

        for subscriber in self.registry.snapshot().await {
            match subscriber.send(Frame::Heartbeat) {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    if self.registry.evict(&subscriber, &e).await {
                        self.stats.record_evicted();
                    }
                    report.evicted += 1;
                }
            }
        }

        self.stats.record_heartbeats(report.sent as u64);
        tracing::debug!(
            sent = report.sent,
            evicted = report.evicted,
            "Sent keep-alive ping"
        );

        report
    }

    /// Run until `shutdown` is cancelled
    ///
    /// The first heartbeat goes out one full interval after start. A round in
    /// progress is abandoned as soon as `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(
            interval_ms = self.interval.as_millis() as u64,
            "Keep-alive monitor started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        _ = self.tick() => {}
                    }
                }
            }
        }

        tracing::debug!("Keep-alive monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeliveryError;
    use crate::registry::Subscriber;
    use crate::testing::test_subscriber;

    #[tokio::test]
    async fn test_tick_pings_and_evicts() {
        let registry = Arc::new(SubscriberRegistry::new());
        let stats = Arc::new(ServerStats::new());
        let (alive, mut alive_frames) = test_subscriber(1);
        let (dead, dead_frames) = test_subscriber(2);
        registry.insert(Arc::clone(&alive)).await;
        registry.insert(dead).await;
        drop(dead_frames);

        let monitor = KeepAliveMonitor::new(
            Arc::clone(&registry),
            Arc::clone(&stats),
            Duration::from_secs(30),
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
        let report = monitor.tick().await;

        assert_eq!(report, HeartbeatReport { sent: 1, evicted: 1 });
        assert_eq!(alive_frames.try_recv(), Ok(Frame::Heartbeat));
        assert!(alive.last_active_at() > alive.connected_at());
        assert_eq!(registry.len().await, 1);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.heartbeats_sent, 1);
        assert_eq!(snapshot.subscribers_evicted, 1);
    }

    #[tokio::test]
    async fn test_stalled_subscriber_evicted_once_queue_fills() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (stalled, _frames) = Subscriber::new(1, None, 2);
        registry.insert(Arc::new(stalled)).await;

        let monitor = KeepAliveMonitor::new(
            Arc::clone(&registry),
            Arc::new(ServerStats::new()),
            Duration::from_secs(30),
        );

        assert_eq!(monitor.tick().await.sent, 1);
        assert_eq!(monitor.tick().await.sent, 1);
        assert_eq!(monitor.tick().await, HeartbeatReport { sent: 0, evicted: 1 });
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_run_pings_every_interval_until_cancelled() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (sub, mut frames) = test_subscriber(1);
        registry.insert(sub).await;

        let monitor = KeepAliveMonitor::new(
            Arc::clone(&registry),
            Arc::new(ServerStats::new()),
            Duration::from_millis(20),
        );
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(monitor.run(shutdown.clone()));

        for _ in 0..3 {
            let frame = tokio::time::timeout(Duration::from_secs(1), frames.recv())
                .await
                .expect("heartbeat within interval");
            assert_eq!(frame, Some(Frame::Heartbeat));
        }

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor stops on cancel")
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_stops_while_registry_is_locked() {
        let registry = Arc::new(SubscriberRegistry::new());
        let monitor = KeepAliveMonitor::new(
            Arc::clone(&registry),
            Arc::new(ServerStats::new()),
            Duration::from_millis(10),
        );

        // Hold the registry so a started round cannot finish
        let held = registry.hold_for_test().await;
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(monitor.run(shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor stops mid-round")
            .unwrap();
        drop(held);
    }

    #[tokio::test]
    async fn test_tick_after_dispatcher_eviction_is_harmless() {
        let registry = Arc::new(SubscriberRegistry::new());
        let stats = Arc::new(ServerStats::new());
        let (sub, _frames) = test_subscriber(1);
        registry.insert(Arc::clone(&sub)).await;

        // Dispatcher already evicted and closed it, but monitor holds a stale snapshot
        let stale = registry.snapshot().await;
        assert!(registry.evict(&sub, &DeliveryError::Disconnected).await);

        for subscriber in stale {
            let err = subscriber.send(Frame::Heartbeat).unwrap_err();
            assert_eq!(err, DeliveryError::Closed);
            assert!(!registry.evict(&subscriber, &err).await);
        }

        let monitor = KeepAliveMonitor::new(Arc::clone(&registry), stats, Duration::from_secs(30));
        assert_eq!(monitor.tick().await, HeartbeatReport::default());
    }
}
