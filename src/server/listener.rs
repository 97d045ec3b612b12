//! SSE server handle
//!
//! Owns the shared state and the supervised background tasks. Construct one
//! per process at the composition root and share it by reference.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use axum::serve::ListenerExt;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::protocol::constants::SHUTDOWN_GRACE_PERIOD;
use crate::registry::{LastValueCache, SubscriberRegistry};
use crate::server::config::ServerConfig;
use crate::server::dispatcher::Dispatcher;
use crate::server::monitor::KeepAliveMonitor;
use crate::server::router::{build_router, AppState};
use crate::stats::{ServerStats, StatsSnapshot};

enum Lifecycle {
    Idle,
    Running {
        serve: JoinHandle<()>,
        monitor: JoinHandle<()>,
    },
    Stopped,
}

/// Server-Sent Events broadcast server
pub struct SseServer {
    config: ServerConfig,
    registry: Arc<SubscriberRegistry>,
    cache: Arc<LastValueCache>,
    stats: Arc<ServerStats>,
    dispatcher: Arc<Dispatcher>,
    app_state: AppState,
    cancel: CancellationToken,
    lifecycle: Mutex<Lifecycle>,
    local_addr: OnceLock<SocketAddr>,
}

impl SseServer {
    /// Create a server; nothing is bound until [`start`](Self::start)
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(SubscriberRegistry::new());
        let cache = Arc::new(LastValueCache::new());
        let stats = Arc::new(ServerStats::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&cache),
            Arc::clone(&stats),
            config.replay_policy,
        ));
        let app_state = AppState::new(&config, Arc::clone(&dispatcher), Arc::clone(&stats));

        Self {
            config,
            registry,
            cache,
            stats,
            dispatcher,
            app_state,
            cancel: CancellationToken::new(),
            lifecycle: Mutex::new(Lifecycle::Idle),
            local_addr: OnceLock::new(),
        }
    }

    /// Build the Axum router serving the subscription path
    ///
    /// `start` serves this router itself; it is exposed for embedding the
    /// endpoint into a larger application.
    pub fn router(&self) -> Result<Router> {
        build_router(&self.config, self.app_state.clone())
    }

    /// Bind the listener and launch the HTTP and keep-alive tasks
    ///
    /// Returns the bound address (useful when binding port 0).
    pub async fn start(&self) -> Result<SocketAddr> {
        let mut lifecycle = self.lifecycle.lock().await;
        match *lifecycle {
            Lifecycle::Idle => {}
            Lifecycle::Running { .. } => return Err(Error::AlreadyStarted),
            Lifecycle::Stopped => return Err(Error::ShutDown),
        }

        let router = self.router()?;

        let addr = self.config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;
        let _ = self.local_addr.set(local_addr);

        let nodelay = self.config.tcp_nodelay;
        let listener = listener.tap_io(move |tcp| {
            if nodelay {
                if let Err(e) = tcp.set_nodelay(true) {
                    tracing::trace!(error = %e, "Failed to set TCP_NODELAY");
                }
            }
        });

        tracing::info!(
            addr = %local_addr,
            path = %self.config.path,
            "SSE server listening"
        );

        let shutdown = self.cancel.clone();
        let serve = tokio::spawn(async move {
            let app = router.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
            {
                tracing::error!(error = %e, "HTTP server failed");
            }
        });

        let monitor = KeepAliveMonitor::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.stats),
            self.config.heartbeat_interval,
        );
        let monitor = tokio::spawn(monitor.run(self.cancel.clone()));

        *lifecycle = Lifecycle::Running { serve, monitor };
        Ok(local_addr)
    }

    /// Broadcast a payload to all subscribers and cache it for late joiners
    ///
    /// Never fails and never waits on a client; subscribers that cannot take
    /// the frame are evicted.
    pub async fn push(&self, payload: impl Into<String>) {
        self.dispatcher.push(payload).await;
    }

    /// Stop accepting, close every subscriber stream and stop both tasks
    ///
    /// Subscriber queues are closed before anything is awaited, so a stalled
    /// client cannot hold this up: open responses get
    /// [`SHUTDOWN_GRACE_PERIOD`] to drain, then the HTTP task is abandoned.
    /// Idempotent. The cached payload is kept.
    pub async fn shutdown(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        let previous = std::mem::replace(&mut *lifecycle, Lifecycle::Stopped);
        self.cancel.cancel();

        let closed = self.dispatcher.close().await;

        if let Lifecycle::Running { mut serve, monitor } = previous {
            if let Err(e) = monitor.await {
                tracing::error!(task = "monitor", error = %e, "Server task failed");
            }

            match tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, &mut serve).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(task = "serve", error = %e, "Server task failed");
                }
                Err(_) => {
                    tracing::warn!(
                        grace_ms = SHUTDOWN_GRACE_PERIOD.as_millis() as u64,
                        "Streams still draining after grace period, abandoning"
                    );
                    serve.abort();
                }
            }

            tracing::info!(closed = closed, "SSE server stopped");
        }
    }

    /// Start, run until `signal` completes, then shut down
    pub async fn run_until<F>(&self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        self.start().await?;
        signal.await;
        tracing::info!("Shutdown signal received");
        self.shutdown().await;
        Ok(())
    }

    /// Address the listener is bound to, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Number of registered subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.registry.len().await
    }

    /// Most recently pushed payload
    pub fn latest(&self) -> Option<Arc<String>> {
        self.cache.get()
    }

    /// Current counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Get a reference to the subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Get the configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl Drop for SseServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
