//! Queue module: the bounded channel between producers and consumers.

mod bounded;

pub use bounded::BoundedQueue;

use thiserror::Error;

use crate::domain::Reading;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// A send reached the queue after `close`. Callers treat this as a broken
    /// shutdown ordering, never as back-pressure.
    #[error("send on closed queue")]
    Closed,
}

/// Non-blocking send failure; the rejected reading is returned to the caller.
#[derive(Debug, Error)]
pub enum TrySendError {
    #[error("queue full")]
    Full(Reading),

    #[error("send on closed queue")]
    Closed(Reading),
}
