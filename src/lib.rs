//! Embedded Server-Sent Events broadcast server
//!
//! Streams opaque text payloads (typically pre-serialized JSON) to any number
//! of concurrently connected HTTP clients over a long-lived
//! `text/event-stream` response.
//!
//! # Architecture
//!
//! ```text
//!                 producer
//!                    │ push(payload)
//!                    ▼
//!             ┌─────────────┐  set   ┌────────────────┐
//!             │ Dispatcher  │───────►│ LastValueCache │◄──┐ get (replay)
//!             └──────┬──────┘        └────────────────┘   │
//!                    │ snapshot                            │
//!                    ▼                                     │
//!          ┌──────────────────┐   attach   ┌──────────┐    │
//!          │SubscriberRegistry│◄───────────│  Router  │────┘
//!          └────────┬─────────┘            │  (axum)  │
//!                   │ snapshot             └──────────┘
//!                   ▼                            ▲ GET /sse
//!          ┌──────────────────┐                  │
//!          │ KeepAliveMonitor │             HTTP clients
//!          └──────────────────┘
//!            ": ping" every interval
//! ```
//!
//! Every subscriber is a bounded frame queue feeding one streaming response.
//! A subscriber whose queue is full, or whose client has gone away, is
//! removed from the registry the first time a frame cannot be queued for it.
//! Newly connected subscribers immediately receive the most recent payload
//! (replay-last) before anything else.
//!
//! # Example
//!
//! ```no_run
//! use progress_sse::{ServerConfig, SseServer};
//!
//! # async fn example() -> progress_sse::error::Result<()> {
//! let server = SseServer::new(ServerConfig::default());
//! let addr = server.start().await?;
//! println!("streaming on http://{}/sse", addr);
//!
//! server.push(r#"{"progress":1}"#).await;
//!
//! server.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{DeliveryError, Error, Result};
pub use protocol::Frame;
pub use registry::{LastValueCache, Subscriber, SubscriberRegistry, SubscriberState};
pub use server::{ReplayPolicy, ServerConfig, SseServer};
pub use stats::{ServerStats, StatsSnapshot};
