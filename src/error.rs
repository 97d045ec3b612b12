//! Error types
//!
//! Only server startup surfaces errors to the caller. Delivery errors are
//! local to one subscriber and are absorbed by eviction.

use std::net::SocketAddr;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),
    /// The listener could not be bound
    Bind {
        /// Requested address
        addr: SocketAddr,
        /// Underlying socket error
        source: std::io::Error,
    },
    /// The configured subscription path cannot be routed
    InvalidPath(String),
    /// `start` was called on a server that is already running
    AlreadyStarted,
    /// The server has been shut down
    ShutDown,
    /// A frame could not be queued for a subscriber
    Delivery(DeliveryError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Bind { addr, source } => write!(f, "Failed to bind {}: {}", addr, source),
            Error::InvalidPath(path) => write!(f, "Invalid subscription path: {}", path),
            Error::AlreadyStarted => write!(f, "Server already started"),
            Error::ShutDown => write!(f, "Server has been shut down"),
            Error::Delivery(e) => write!(f, "Delivery failed: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Bind { source, .. } => Some(source),
            Error::Delivery(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<DeliveryError> for Error {
    fn from(e: DeliveryError) -> Self {
        Error::Delivery(e)
    }
}

/// Why a frame could not be handed to a subscriber
///
/// Every variant means the subscriber is dead or too slow and gets evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The subscriber was already closed
    Closed,
    /// The client went away and its response stream was dropped
    Disconnected,
    /// The subscriber's send queue is full
    Lagging {
        /// Queue capacity in frames
        capacity: usize,
    },
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::Closed => write!(f, "subscriber closed"),
            DeliveryError::Disconnected => write!(f, "client disconnected"),
            DeliveryError::Lagging { capacity } => {
                write!(f, "send queue full ({} frames)", capacity)
            }
        }
    }
}

impl std::error::Error for DeliveryError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_bind_error_display_and_source() {
        let addr: SocketAddr = "127.0.0.1:5974".parse().unwrap();
        let err = Error::Bind {
            addr,
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };

        assert_eq!(err.to_string(), "Failed to bind 127.0.0.1:5974: in use");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_delivery_error_conversion() {
        let err: Error = DeliveryError::Lagging { capacity: 8 }.into();

        assert!(matches!(err, Error::Delivery(DeliveryError::Lagging { capacity: 8 })));
        assert_eq!(err.to_string(), "Delivery failed: send queue full (8 frames)");
    }
}
