//! Subscriber registry and last-value cache
//!
//! The registry holds the live subscribers; the cache holds the payload a
//! late joiner is brought up to date with.
//!
//! # Architecture
//!
//! ```text
//!                   Arc<SubscriberRegistry>
//!              ┌──────────────────────────────┐
//!              │ subscribers: HashMap<u64,    │
//!              │   Arc<Subscriber {           │
//!              │     sender: mpsc::Sender,    │──► response body
//!              │     state, last_active,      │    (one per client)
//!              │   }>                         │
//!              │ >                            │
//!              └──────────────┬───────────────┘
//!                             │ snapshot()
//!              ┌──────────────┴───────────────┐
//!              ▼                              ▼
//!        [Dispatcher]                  [KeepAliveMonitor]
//!        Frame::Data                   Frame::Heartbeat
//!              │                              │
//!              └──── send fails ──► evict() ◄─┘
//! ```
//!
//! # Zero-Copy Design
//!
//! A broadcast allocates its payload once; every subscriber queue holds an
//! `Arc` to the same string.

pub mod cache;
pub mod entry;
pub mod store;

pub use cache::LastValueCache;
pub use entry::{Subscriber, SubscriberState};
pub use store::SubscriberRegistry;
