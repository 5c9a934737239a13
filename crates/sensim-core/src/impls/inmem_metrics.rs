//! InMemoryMetrics - a metrics sink that keeps everything in process.
//!
//! Used by tests to assert on counters and by the CLI to print a final summary.
//! Totals are atomics; per-producer tables sit behind one short-lived lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::domain::ProducerId;
use crate::ports::Metrics;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProducerCounters {
    pub sent: u64,
    pub restarts: u64,
    pub publish_success: u64,
    pub publish_failures: BTreeMap<&'static str, u64>,
    pub publish_attempts: u64,
    pub publish_latency_total: Duration,
}

impl ProducerCounters {
    pub fn failures(&self) -> u64 {
        self.publish_failures.values().sum()
    }
}

/// Aggregated view across all producers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub active_producers: i64,
    pub sent: u64,
    pub received: u64,
    pub restarts: u64,
    pub publish_success: u64,
    pub publish_failures: u64,
    pub broker_connected: bool,
}

#[derive(Default)]
pub struct InMemoryMetrics {
    active_producers: AtomicI64,
    received: AtomicU64,
    broker_connected: AtomicBool,
    producers: Mutex<HashMap<ProducerId, ProducerCounters>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<ProducerId, ProducerCounters>> {
        self.producers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_producer(&self, id: ProducerId, f: impl FnOnce(&mut ProducerCounters)) {
        f(self.table().entry(id).or_default());
    }

    pub fn producer(&self, id: ProducerId) -> ProducerCounters {
        self.table().get(&id).cloned().unwrap_or_default()
    }

    pub fn producer_ids(&self) -> Vec<ProducerId> {
        let mut ids: Vec<_> = self.table().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn active_producers(&self) -> i64 {
        self.active_producers.load(Ordering::Relaxed)
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn broker_connected(&self) -> bool {
        self.broker_connected.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let table = self.table();
        let mut snapshot = MetricsSnapshot {
            active_producers: self.active_producers(),
            received: self.received(),
            broker_connected: self.broker_connected(),
            ..MetricsSnapshot::default()
        };
        for counters in table.values() {
            snapshot.sent += counters.sent;
            snapshot.restarts += counters.restarts;
            snapshot.publish_success += counters.publish_success;
            snapshot.publish_failures += counters.failures();
        }
        snapshot
    }
}

impl Metrics for InMemoryMetrics {
    fn producer_started(&self, _id: ProducerId) {
        self.active_producers.fetch_add(1, Ordering::Relaxed);
    }

    fn producer_stopped(&self, _id: ProducerId) {
        self.active_producers.fetch_sub(1, Ordering::Relaxed);
    }

    fn reading_sent(&self, id: ProducerId) {
        self.with_producer(id, |c| c.sent += 1);
    }

    fn reading_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    fn producer_restarted(&self, id: ProducerId) {
        self.with_producer(id, |c| c.restarts += 1);
    }

    fn publish_succeeded(&self, id: ProducerId) {
        self.with_producer(id, |c| c.publish_success += 1);
    }

    fn publish_failed(&self, id: ProducerId, reason: &'static str) {
        self.with_producer(id, |c| *c.publish_failures.entry(reason).or_default() += 1);
    }

    fn publish_latency(&self, id: ProducerId, latency: Duration) {
        self.with_producer(id, |c| {
            c.publish_attempts += 1;
            c.publish_latency_total += latency;
        });
    }

    fn broker_connection(&self, connected: bool) {
        self.broker_connected.store(connected, Ordering::Relaxed);
    }
}
