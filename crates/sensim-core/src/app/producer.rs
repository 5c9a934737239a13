//! Producer - one simulated sensor emitting readings on a fixed interval.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::{ProducerId, Reading};
use crate::ports::{Clock, Metrics, Source};
use crate::queue::{BoundedQueue, QueueError};

/// One run of a producer slot.
///
/// The fault barrier builds a new `Producer` (with a fresh `Source`) for every run;
/// only `sent` is shared across runs of the same slot.
pub struct Producer {
    id: ProducerId,
    interval: Duration,
    source: Box<dyn Source>,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn Metrics>,
    sent: Arc<AtomicU64>,
    last_captured_at: Option<DateTime<Utc>>,
}

impl Producer {
    pub fn new(
        id: ProducerId,
        interval: Duration,
        source: Box<dyn Source>,
        clock: Arc<dyn Clock>,
        metrics: Arc<dyn Metrics>,
        sent: Arc<AtomicU64>,
    ) -> Self {
        Self {
            id,
            interval,
            source,
            clock,
            metrics,
            sent,
            last_captured_at: None,
        }
    }

    fn sample(&mut self) -> Reading {
        let value = self.source.sample();

        // wall clock may step back; keep this producer's sequence non-decreasing
        let mut captured_at = self.clock.now();
        if let Some(last) = self.last_captured_at
            && captured_at < last
        {
            captured_at = last;
        }
        self.last_captured_at = Some(captured_at);

        Reading::new(self.id, value, captured_at)
    }

    /// Emit one reading per tick until `cancel` fires.
    ///
    /// Cancellation is checked on every tick and right before each send. A send that
    /// is already waiting for space is completed rather than abandoned: consumers keep
    /// draining until the queue is closed, so it finishes in bounded time.
    ///
    /// Returns `Err(QueueError::Closed)` only if the queue was closed under a running
    /// producer, i.e. the shutdown ordering was broken.
    pub async fn run(
        mut self,
        queue: Arc<BoundedQueue>,
        cancel: CancellationToken,
    ) -> Result<(), QueueError> {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!(producer_id = %self.id, "producer starting");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if cancel.is_cancelled() {
                break;
            }

            let reading = self.sample();
            queue.send(reading).await?;
            self.sent.fetch_add(1, Ordering::Relaxed);
            self.metrics.reading_sent(self.id);
        }

        debug!(producer_id = %self.id, sent = self.sent.load(Ordering::Relaxed), "producer stopping");
        Ok(())
    }
}
