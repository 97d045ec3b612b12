//! Statistics for the broadcast server

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated lock-free from every task
#[derive(Debug, Default)]
pub struct ServerStats {
    connections_accepted: AtomicU64,
    connections_rejected: AtomicU64,
    subscribers_evicted: AtomicU64,
    pushes: AtomicU64,
    data_frames_sent: AtomicU64,
    heartbeats_sent: AtomicU64,
}

impl ServerStats {
    /// Create a zeroed set of counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_accepted(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evicted(&self) {
        self.subscribers_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_push(&self, delivered: u64) {
        self.pushes.fetch_add(1, Ordering::Relaxed);
        self.data_frames_sent.fetch_add(delivered, Ordering::Relaxed);
    }

    pub(crate) fn record_replay(&self) {
        self.data_frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_heartbeats(&self, sent: u64) {
        self.heartbeats_sent.fetch_add(sent, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            subscribers_evicted: self.subscribers_evicted.load(Ordering::Relaxed),
            pushes: self.pushes.load(Ordering::Relaxed),
            data_frames_sent: self.data_frames_sent.load(Ordering::Relaxed),
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ServerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Subscriptions accepted and registered
    pub connections_accepted: u64,
    /// Requests answered with 404 or 503
    pub connections_rejected: u64,
    /// Subscribers removed after a failed send
    pub subscribers_evicted: u64,
    /// Calls to `push`
    pub pushes: u64,
    /// Data frames queued, replays included
    pub data_frames_sent: u64,
    /// Heartbeat frames queued
    pub heartbeats_sent: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = ServerStats::new();

        stats.record_accepted();
        stats.record_accepted();
        stats.record_rejected();
        stats.record_push(2);
        stats.record_replay();
        stats.record_heartbeats(3);
        stats.record_evicted();

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                connections_accepted: 2,
                connections_rejected: 1,
                subscribers_evicted: 1,
                pushes: 1,
                data_frames_sent: 3,
                heartbeats_sent: 3,
            }
        );
    }
}
