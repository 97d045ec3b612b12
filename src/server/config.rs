//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::protocol::constants::*;

/// What a newly connected subscriber receives before live frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayPolicy {
    /// Replay the most recently pushed payload, if any
    #[default]
    LastValue,
    /// Send nothing until the next push
    None,
}

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Subscription path, e.g. `/sse`
    pub path: String,

    /// Interval between keep-alive frames
    pub heartbeat_interval: Duration,

    /// Frames a subscriber may have queued before it is evicted
    pub send_queue_capacity: usize,

    /// Maximum concurrent subscribers (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Late-joiner policy
    pub replay_policy: ReplayPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            path: DEFAULT_SSE_PATH.to_string(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            send_queue_capacity: DEFAULT_SEND_QUEUE_CAPACITY,
            max_connections: 0, // Unlimited
            tcp_nodelay: true,  // Frames are small and latency matters
            replay_policy: ReplayPolicy::LastValue,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the subscription path; a leading `/` is added if missing
    pub fn path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        self
    }

    /// Set the keep-alive interval
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the per-subscriber queue depth
    pub fn send_queue_capacity(mut self, frames: usize) -> Self {
        self.send_queue_capacity = frames;
        self
    }

    /// Set maximum concurrent subscribers
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Set the late-joiner policy
    pub fn replay_policy(mut self, policy: ReplayPolicy) -> Self {
        self.replay_policy = policy;
        self
    }

    /// Routes that serve the subscription endpoint
    ///
    /// The configured path plus the same path with one trailing slash.
    pub fn route_paths(&self) -> Vec<String> {
        let base = self.path.trim_end_matches('/');
        if base.is_empty() {
            vec!["/".to_string()]
        } else {
            vec![base.to_string(), format!("{}/", base)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr, "127.0.0.1:5974".parse().unwrap());
        assert_eq!(config.path, "/sse");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.send_queue_capacity, 64);
        assert_eq!(config.max_connections, 0);
        assert!(config.tcp_nodelay);
        assert_eq!(config.replay_policy, ReplayPolicy::LastValue);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "0.0.0.0:8080".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn test_builder_path_normalized() {
        assert_eq!(ServerConfig::default().path("events").path, "/events");
        assert_eq!(ServerConfig::default().path("/events").path, "/events");
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(ServerConfig::default().route_paths(), vec!["/sse", "/sse/"]);
        assert_eq!(
            ServerConfig::default().path("/events/").route_paths(),
            vec!["/events", "/events/"]
        );
        assert_eq!(ServerConfig::default().path("/").route_paths(), vec!["/"]);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .heartbeat_interval(Duration::from_millis(50))
            .send_queue_capacity(8)
            .max_connections(10)
            .tcp_nodelay(false)
            .replay_policy(ReplayPolicy::None);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.heartbeat_interval, Duration::from_millis(50));
        assert_eq!(config.send_queue_capacity, 8);
        assert_eq!(config.max_connections, 10);
        assert!(!config.tcp_nodelay);
        assert_eq!(config.replay_policy, ReplayPolicy::None);
    }
}
