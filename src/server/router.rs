//! HTTP routing
//!
//! One route serves the event stream; everything else falls through to 404.
//! Each accepted request registers a subscriber whose queue becomes the
//! response body, so the subscription lives exactly as long as the body.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_stream::Stream;
use tower_http::cors::CorsLayer;

use crate::error::{Error, Result};
use crate::protocol::Frame;
use crate::registry::Subscriber;
use crate::server::config::ServerConfig;
use crate::server::dispatcher::Dispatcher;
use crate::stats::ServerStats;

/// Shared state accessible from the handlers
#[derive(Clone)]
pub(crate) struct AppState {
    dispatcher: Arc<Dispatcher>,
    stats: Arc<ServerStats>,
    /// `None` when connections are unlimited
    limiter: Option<Arc<Semaphore>>,
    next_subscriber_id: Arc<AtomicU64>,
    send_queue_capacity: usize,
}

impl AppState {
    /// Create the handler state for `config`
    pub(crate) fn new(
        config: &ServerConfig,
        dispatcher: Arc<Dispatcher>,
        stats: Arc<ServerStats>,
    ) -> Self {
        let limiter = (config.max_connections > 0).then(|| {
            Arc::new(Semaphore::new(
                config.max_connections.min(Semaphore::MAX_PERMITS),
            ))
        });

        Self {
            dispatcher,
            stats,
            limiter,
            next_subscriber_id: Arc::new(AtomicU64::new(1)),
            send_queue_capacity: config.send_queue_capacity,
        }
    }
}

/// Build the router: subscription routes, a 404 fallback and open CORS
pub(crate) fn build_router(config: &ServerConfig, state: AppState) -> Result<Router> {
    let mut router = Router::new();
    for path in config.route_paths() {
        validate_route(&path)?;
        router = router.route(&path, any(subscribe));
    }

    Ok(router
        .fallback(not_found)
        .with_state(state)
        .layer(CorsLayer::permissive()))
}

/// Reject paths the router would read as captures or wildcards
fn validate_route(path: &str) -> Result<()> {
    let dynamic = path.split('/').any(|segment| {
        segment.starts_with(':')
            || segment.starts_with('*')
            || segment.contains('{')
            || segment.contains('}')
    });

    if dynamic {
        Err(Error::InvalidPath(path.to_string()))
    } else {
        Ok(())
    }
}

/// Any method on the subscription path
///
/// The connection-limit permit is taken before the subscriber is created and
/// travels with the response body, so concurrent requests can never overshoot
/// the limit.
async fn subscribe(State(state): State<AppState>, request: Request) -> Response {
    let peer_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);

    let permit = match &state.limiter {
        Some(limiter) => match Arc::clone(limiter).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                state.stats.record_rejected();
                tracing::warn!(peer = ?peer_addr, "Rejected subscriber: connection limit reached");
                return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached")
                    .into_response();
            }
        },
        None => None,
    };

    let id = state.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
    let (subscriber, frames) = Subscriber::new(id, peer_addr, state.send_queue_capacity);

    if let Err(e) = state.dispatcher.attach(Arc::new(subscriber)).await {
        state.stats.record_rejected();
        tracing::debug!(
            subscriber_id = id,
            peer = ?peer_addr,
            error = %e,
            "Subscriber not registered"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "server shutting down").into_response();
    }

    state.stats.record_accepted();
    tracing::debug!(
        subscriber_id = id,
        peer = ?peer_addr,
        method = %request.method(),
        user_agent = ?request.headers().get(header::USER_AGENT),
        "Client connected"
    );

    Sse::new(EventStream {
        frames,
        _permit: permit,
    })
    .into_response()
}

async fn not_found(State(state): State<AppState>, uri: Uri) -> (StatusCode, &'static str) {
    state.stats.record_rejected();
    tracing::warn!(path = %uri.path(), "Rejected request for unknown path");
    (StatusCode::NOT_FOUND, "not found")
}

/// Response body of one subscriber
///
/// Ends once the subscriber is closed and its queue drained. Dropped by the
/// HTTP layer when the client goes away, which makes the next send fail.
struct EventStream {
    frames: mpsc::Receiver<Frame>,
    _permit: Option<OwnedSemaphorePermit>,
}

impl Stream for EventStream {
    type Item = std::result::Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.frames
            .poll_recv(cx)
            .map(|frame| frame.map(|frame| Ok(frame.into_event())))
    }
}
