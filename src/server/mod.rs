//! SSE server: HTTP routing, dispatcher and keep-alive monitor

pub mod config;
pub mod dispatcher;
pub mod listener;
pub mod monitor;
pub(crate) mod router;

pub use config::{ReplayPolicy, ServerConfig};
pub use dispatcher::{Dispatcher, PushReport};
pub use listener::SseServer;
pub use monitor::{HeartbeatReport, KeepAliveMonitor};
