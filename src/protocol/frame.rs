//! Event-stream frames
//!
//! Two frame kinds exist on the wire:
//!
//! ```text
//! data: <payload>\n\n      data frame
//! : ping\n\n               heartbeat (comment line, ignored by EventSource)
//! ```
//!
//! Frames travel through each subscriber's queue as [`Frame`] values that
//! share one payload allocation, and are rendered into SSE events only when
//! the response stream is polled.

use std::borrow::Cow;
use std::sync::Arc;

use axum::response::sse::Event;

use super::constants::HEARTBEAT_COMMENT;

/// A single queued event-stream frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Carries an opaque payload
    Data(Arc<String>),
    /// Content-free keep-alive
    Heartbeat,
}

impl Frame {
    /// Payload of a data frame
    pub fn payload(&self) -> Option<&str> {
        match self {
            Frame::Data(payload) => Some(payload.as_str()),
            Frame::Heartbeat => None,
        }
    }

    /// Render as an SSE event
    ///
    /// A payload spanning several lines becomes several `data:` lines, which
    /// EventSource joins back with `\n`.
    pub fn into_event(self) -> Event {
        match self {
            Frame::Data(payload) => Event::default().data(normalize_line_breaks(&payload)),
            Frame::Heartbeat => Event::default().comment(HEARTBEAT_COMMENT),
        }
    }
}

/// Rewrite `\r\n` and lone `\r` as `\n`
///
/// SSE treats all three as line terminators, and `Event` only splits on `\n`.
fn normalize_line_breaks(payload: &str) -> Cow<'_, str> {
    if payload.contains('\r') {
        Cow::Owned(payload.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(payload)
    }
}
