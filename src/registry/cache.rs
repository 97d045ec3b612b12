//! Last-value cache
//!
//! Holds the most recently broadcast payload so late joiners can be brought
//! up to date immediately. Reads and writes are a single atomic pointer swap.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// Single-slot payload cache
#[derive(Debug, Default)]
pub struct LastValueCache {
    latest: ArcSwapOption<String>,
}

impl LastValueCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached payload
    pub fn set(&self, payload: Arc<String>) {
        self.latest.store(Some(payload));
    }

    /// Most recent payload, if any has been set
    pub fn get(&self) -> Option<Arc<String>> {
        self.latest.load_full()
    }

    /// Forget the cached payload
    pub fn clear(&self) {
        self.latest.store(None);
    }

    /// Whether a payload is cached
    pub fn is_empty(&self) -> bool {
        self.latest.load().is_none()
    }
}
