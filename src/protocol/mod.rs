//! Wire protocol: event-stream frames and defaults

pub mod constants;
pub mod frame;

pub use frame::Frame;
