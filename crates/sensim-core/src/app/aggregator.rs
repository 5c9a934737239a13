//! Aggregator - the single reader of the shared queue.
//!
//! Drains to completion: cancellation is only noted, the loop ends when the queue
//! reports closed-and-empty. Optionally forwards every reading into a fan-out queue
//! for the publisher, which it closes once its own drain is done.
//!
//! The hand-off never waits: a full or closed fan-out drops the reading from the
//! publish path (recorded as a `dropped` publish failure) so a slow or dead broker
//! cannot hold back the primary queue.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::Reading;
use crate::ports::Metrics;
use crate::queue::{BoundedQueue, TrySendError};

/// Failure reason recorded for readings that never reached the broker.
pub const DROPPED: &str = "dropped";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregatorReport {
    pub received: u64,

    /// Readings handed to the publisher fan-out (0 when publishing is off).
    pub forwarded: u64,

    /// Readings the fan-out could not take (full, or closed under us).
    pub dropped: u64,
}

pub struct Aggregator {
    queue: Arc<BoundedQueue>,
    fanout: Option<Arc<BoundedQueue>>,
    metrics: Arc<dyn Metrics>,
    summary_interval: Duration,
}

impl Aggregator {
    pub fn new(
        queue: Arc<BoundedQueue>,
        metrics: Arc<dyn Metrics>,
        summary_interval: Duration,
    ) -> Self {
        Self {
            queue,
            fanout: None,
            metrics,
            summary_interval,
        }
    }

    pub fn with_fanout(mut self, fanout: Arc<BoundedQueue>) -> Self {
        self.fanout = Some(fanout);
        self
    }

    pub async fn run(self, cancel: CancellationToken) -> AggregatorReport {
        let mut summary =
            time::interval_at(Instant::now() + self.summary_interval, self.summary_interval);
        summary.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut report = AggregatorReport::default();
        let mut last_summary = 0_u64;
        let mut draining = false;

        info!("aggregator starting");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled(), if !draining => {
                    draining = true;
                    info!(
                        received = report.received,
                        buffered = self.queue.len(),
                        "cancellation observed; draining queue"
                    );
                }
                _ = summary.tick() => {
                    info!(
                        received = report.received,
                        since_last = report.received - last_summary,
                        buffered = self.queue.len(),
                        "aggregator summary"
                    );
                    last_summary = report.received;
                }
                next = self.queue.recv() => {
                    // None = closed and fully drained
                    let Some(reading) = next else { break };
                    report.received += 1;
                    self.metrics.reading_received();
                    debug!(producer_id = %reading.producer_id, value = reading.value, "reading received");

                    if let Some(fanout) = &self.fanout {
                        self.forward(fanout, reading, &mut report);
                    }
                }
            }
        }

        if let Some(fanout) = &self.fanout {
            fanout.close();
        }
        info!(
            received = report.received,
            forwarded = report.forwarded,
            dropped = report.dropped,
            "aggregator stopping"
        );
        report
    }

    fn forward(&self, fanout: &BoundedQueue, reading: Reading, report: &mut AggregatorReport) {
        let (reading, closed) = match fanout.try_send(reading) {
            Ok(()) => {
                report.forwarded += 1;
                return;
            }
            Err(TrySendError::Full(reading)) => (reading, false),
            Err(TrySendError::Closed(reading)) => (reading, true),
        };

        report.dropped += 1;
        self.metrics.publish_failed(reading.producer_id, DROPPED);
        // 最初の 1 件だけ warn、以降は debug
        if report.dropped == 1 {
            warn!(producer_id = %reading.producer_id, closed, "publisher fan-out unavailable; dropping readings from the publish path");
        } else {
            debug!(producer_id = %reading.producer_id, closed, "reading dropped from publish path");
        }
    }
}
