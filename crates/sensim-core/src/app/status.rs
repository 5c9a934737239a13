//! Status - 1 run の最終レポート

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::aggregator::AggregatorReport;
use super::publisher_loop::PublisherReport;
use crate::domain::{ProducerId, RunId, SlotReport};
use crate::queue::BoundedQueue;

/// SimReport は run 終了時の集計
///
/// CLI はこれを JSON で出力する。
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Sorted by producer id.
    pub producers: Vec<SlotReport>,

    pub sent: u64,
    pub received: u64,
    pub restarts: u64,
    pub forwarded: u64,

    /// Readings that left the publish path unpublished: refused by the fan-out
    /// plus those discarded after the publisher's drain deadline.
    pub dropped: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<PublisherReport>,

    pub queue_capacity: usize,
    pub queue_high_watermark: usize,

    /// Must be 0; anything else means the shutdown ordering was broken.
    pub sends_after_close: u64,
}

impl SimReport {
    pub(crate) fn new(
        run_id: RunId,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        mut producers: Vec<SlotReport>,
        aggregator: AggregatorReport,
        publisher: Option<PublisherReport>,
    ) -> Self {
        producers.sort_by_key(|slot| slot.producer_id);
        let sent = producers.iter().map(|slot| slot.sent).sum();
        let restarts = producers.iter().map(|slot| u64::from(slot.restarts)).sum();
        let dropped = aggregator.dropped + publisher.map_or(0, |p| p.dropped);
        Self {
            run_id,
            started_at,
            finished_at,
            producers,
            sent,
            received: aggregator.received,
            restarts,
            forwarded: aggregator.forwarded,
            dropped,
            publisher,
            queue_capacity: 0,
            queue_high_watermark: 0,
            sends_after_close: 0,
        }
    }

    pub(crate) fn with_queue_stats(mut self, queue: &BoundedQueue) -> Self {
        self.queue_capacity = queue.capacity();
        self.queue_high_watermark = queue.high_watermark();
        self.sends_after_close = queue.sends_after_close();
        self
    }

    pub fn slot(&self, id: ProducerId) -> Option<&SlotReport> {
        self.producers
            .binary_search_by_key(&id, |slot| slot.producer_id)
            .ok()
            .map(|idx| &self.producers[idx])
    }

    /// Every reading that was enqueued reached the aggregator.
    pub fn is_lossless(&self) -> bool {
        self.sent == self.received
    }
}
