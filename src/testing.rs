//! Test helpers shared by unit tests

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::protocol::Frame;
use crate::registry::Subscriber;

/// Subscriber with a small queue; the receiver plays the response stream
pub(crate) fn test_subscriber(id: u64) -> (Arc<Subscriber>, mpsc::Receiver<Frame>) {
    let (subscriber, frames) = Subscriber::new(id, None, 16);
    (Arc::new(subscriber), frames)
}

/// Next queued frame, which must be a data frame
pub(crate) fn next_payload(frames: &mut mpsc::Receiver<Frame>) -> String {
    match frames.try_recv() {
        Ok(Frame::Data(payload)) => payload.to_string(),
        other => panic!("expected a data frame, got {:?}", other),
    }
}

/// Assert that nothing is queued
pub(crate) fn assert_nothing_queued(frames: &mut mpsc::Receiver<Frame>) {
    let next = frames.try_recv();
    assert!(
        matches!(next, Err(TryRecvError::Empty)),
        "expected an empty queue, got {:?}",
        next
    );
}
