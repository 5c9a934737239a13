//! Metrics port - counters and gauges handed to an external collector.
//!
//! Components receive an `Arc<dyn Metrics>` instead of touching a global registry.
//! Every method defaults to a no-op, so a sink only overrides what it records and
//! `NoopMetrics` stands in when no sink was configured.

use std::time::Duration;

use crate::domain::ProducerId;

pub trait Metrics: Send + Sync {
    /// Active-producer gauge +1.
    fn producer_started(&self, _id: ProducerId) {}

    /// Active-producer gauge -1.
    fn producer_stopped(&self, _id: ProducerId) {}

    /// messages-sent per producer.
    fn reading_sent(&self, _id: ProducerId) {}

    /// messages-received total.
    fn reading_received(&self) {}

    /// restarts per producer.
    fn producer_restarted(&self, _id: ProducerId) {}

    fn publish_succeeded(&self, _id: ProducerId) {}

    /// publish failures per producer and reason.
    fn publish_failed(&self, _id: ProducerId, _reason: &'static str) {}

    /// publish latency per producer (observed for every attempted publish).
    fn publish_latency(&self, _id: ProducerId, _latency: Duration) {}

    /// broker-connection-status (0/1).
    fn broker_connection(&self, _connected: bool) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {}
