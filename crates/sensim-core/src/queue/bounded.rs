//! Fixed-capacity FIFO queue with blocking send and explicit close.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use super::{QueueError, TrySendError};
use crate::domain::Reading;

struct QueueState {
    buf: VecDeque<Reading>,
    closed: bool,

    /// Largest buffered length ever observed.
    high_watermark: usize,
}

/// Bounded multi-writer queue of readings.
///
/// Design:
/// - `send` waits while the buffer holds `capacity` readings (back-pressure, never drop).
/// - `recv` waits while empty and returns `None` only once closed *and* drained.
/// - `close` is idempotent; any later `send` is rejected and counted.
/// - The lock is never held across an await; waiting happens on `Notify`.
///   `notify_one` stores a permit when nobody is waiting yet, so a waiter that checks
///   the state and then awaits cannot miss a wake-up.
pub struct BoundedQueue {
    state: Mutex<QueueState>,
    capacity: usize,

    /// Signalled on push and on close.
    readable: Notify,

    /// Signalled on pop and on close.
    writable: Notify,

    sends_after_close: AtomicU64,
}

impl BoundedQueue {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                buf: VecDeque::with_capacity(capacity),
                closed: false,
                high_watermark: 0,
            }),
            capacity,
            readable: Notify::new(),
            writable: Notify::new(),
            sends_after_close: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // State stays consistent even if a holder panicked: every critical section
        // is a single push/pop/flag write.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue, waiting for space if the queue is full.
    pub async fn send(&self, reading: Reading) -> Result<(), QueueError> {
        loop {
            {
                let mut state = self.lock();
                if state.closed {
                    drop(state);
                    self.sends_after_close.fetch_add(1, Ordering::Relaxed);
                    // pass the wake-up on to any other writer parked on close
                    self.writable.notify_one();
                    return Err(QueueError::Closed);
                }
                if state.buf.len() < self.capacity {
                    state.buf.push_back(reading);
                    state.high_watermark = state.high_watermark.max(state.buf.len());
                    drop(state);
                    self.readable.notify_one();
                    return Ok(());
                }
            }
            self.writable.notified().await;
        }
    }

    /// Enqueue without waiting. The reading is handed back when it cannot be taken.
    pub fn try_send(&self, reading: Reading) -> Result<(), TrySendError> {
        let mut state = self.lock();
        if state.closed {
            drop(state);
            self.sends_after_close.fetch_add(1, Ordering::Relaxed);
            return Err(TrySendError::Closed(reading));
        }
        if state.buf.len() >= self.capacity {
            return Err(TrySendError::Full(reading));
        }
        state.buf.push_back(reading);
        state.high_watermark = state.high_watermark.max(state.buf.len());
        drop(state);
        self.readable.notify_one();
        Ok(())
    }

    /// Dequeue the oldest reading, waiting while empty.
    ///
    /// Returns `None` once the queue is closed and every buffered reading was taken.
    pub async fn recv(&self) -> Option<Reading> {
        loop {
            {
                let mut state = self.lock();
                if let Some(reading) = state.buf.pop_front() {
                    drop(state);
                    self.writable.notify_one();
                    return Some(reading);
                }
                if state.closed {
                    drop(state);
                    self.readable.notify_one();
                    return None;
                }
            }
            self.readable.notified().await;
        }
    }

    /// Close the queue. Returns `true` for the call that actually closed it.
    pub fn close(&self) -> bool {
        let first = {
            let mut state = self.lock();
            let first = !state.closed;
            state.closed = true;
            first
        };
        self.readable.notify_waiters();
        self.readable.notify_one();
        self.writable.notify_waiters();
        self.writable.notify_one();
        first
    }

    pub fn len(&self) -> usize {
        self.lock().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn high_watermark(&self) -> usize {
        self.lock().high_watermark
    }

    /// Sends rejected because the queue was already closed. Zero in a correct run.
    pub fn sends_after_close(&self) -> u64 {
        self.sends_after_close.load(Ordering::Relaxed)
    }
}
