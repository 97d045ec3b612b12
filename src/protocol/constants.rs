//! Wire constants

use std::time::Duration;

/// Default subscription path
pub const DEFAULT_SSE_PATH: &str = "/sse";

/// Default listen port
pub const DEFAULT_PORT: u16 = 5974;

/// Text of the heartbeat comment line (`: ping`)
pub const HEARTBEAT_COMMENT: &str = "ping";

/// Default keep-alive interval
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Default per-subscriber queue depth, in frames
pub const DEFAULT_SEND_QUEUE_CAPACITY: usize = 64;

/// Time open streams get to drain after shutdown closes them
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(1);
