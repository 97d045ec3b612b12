//! Subscriber handle and lifecycle state
//!
//! A subscriber is passive state: the sending half of a bounded frame queue
//! whose receiving half is the body of one open event-stream response.
//! Broadcasts and heartbeats only ever `try_send` into it, so no caller
//! waits on a client's socket.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::DeliveryError;
use crate::protocol::Frame;

/// Lifecycle of a subscriber
///
/// `Connecting -> Streaming -> Closed`; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    /// Request accepted, not yet registered
    Connecting,
    /// Registered and receiving frames
    Streaming,
    /// Queue closed
    Closed,
}

impl SubscriberState {
    fn as_u8(self) -> u8 {
        match self {
            SubscriberState::Connecting => 0,
            SubscriberState::Streaming => 1,
            SubscriberState::Closed => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => SubscriberState::Connecting,
            1 => SubscriberState::Streaming,
            _ => SubscriberState::Closed,
        }
    }
}

/// One open outbound event stream
pub struct Subscriber {
    id: u64,
    peer_addr: Option<SocketAddr>,
    /// `None` once closed; dropping the last sender ends the response body
    sender: ArcSwapOption<mpsc::Sender<Frame>>,
    capacity: usize,
    state: AtomicU8,
    connected_at: Instant,
    /// Milliseconds since `connected_at` of the last accepted frame
    last_active_ms: AtomicU64,
}

impl Subscriber {
    /// Create a subscriber and the receiver its response stream reads from
    ///
    /// `capacity` is clamped to at least one frame.
    pub fn new(
        id: u64,
        peer_addr: Option<SocketAddr>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Frame>) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);

        let subscriber = Self {
            id,
            peer_addr,
            sender: ArcSwapOption::from_pointee(tx),
            capacity,
            state: AtomicU8::new(SubscriberState::Connecting.as_u8()),
            connected_at: Instant::now(),
            last_active_ms: AtomicU64::new(0),
        };
        (subscriber, rx)
    }

    /// Unique subscriber ID
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remote address, if known
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Current lifecycle state
    pub fn state(&self) -> SubscriberState {
        SubscriberState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// When the connection was accepted
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// When the last frame was accepted into the queue
    pub fn last_active_at(&self) -> Instant {
        self.connected_at + Duration::from_millis(self.last_active_ms.load(Ordering::Relaxed))
    }

    /// Time since the last accepted frame
    pub fn idle_for(&self) -> Duration {
        self.last_active_at().elapsed()
    }

    /// Move `Connecting -> Streaming`. No effect once closed.
    pub(crate) fn mark_streaming(&self) {
        let _ = self.state.compare_exchange(
            SubscriberState::Connecting.as_u8(),
            SubscriberState::Streaming.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Queue a frame without waiting
    ///
    /// Any error means the subscriber is dead or cannot keep up and should
    /// be evicted.
    pub fn send(&self, frame: Frame) -> Result<(), DeliveryError> {
        let sender = self.sender.load();
        let tx = sender.as_ref().ok_or(DeliveryError::Closed)?;

        tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Lagging {
                capacity: self.capacity,
            },
            TrySendError::Closed(_) => DeliveryError::Disconnected,
        })?;

        let elapsed = self.connected_at.elapsed().as_millis() as u64;
        self.last_active_ms.store(elapsed, Ordering::Relaxed);
        Ok(())
    }

    /// Close the queue
    ///
    /// Frames already queued are still delivered, then the response body
    /// ends. Idempotent: returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        self.state.store(SubscriberState::Closed.as_u8(), Ordering::Release);
        self.sender.swap(None).is_some()
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("state", &self.state())
            .finish()
    }
}
