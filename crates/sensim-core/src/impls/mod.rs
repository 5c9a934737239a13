//! Impls - in-process implementations of the ports.
//!
//! # 含まれる実装
//! - **InMemoryBroker**: broker stand-in with switchable connectivity/latency/rejection
//! - **InMemoryMetrics**: counters kept in memory (tests, CLI summary)
//! - **UniformSourceFactory**: default uniform [0, 1) value source
//!
//! A wire-level broker client or a metrics exporter would implement the same ports
//! in a separate crate.

pub mod inmem_broker;
pub mod inmem_metrics;
pub mod uniform_source;

pub use self::inmem_broker::{InMemoryBroker, PublishedMessage};
pub use self::inmem_metrics::{InMemoryMetrics, MetricsSnapshot, ProducerCounters};
pub use self::uniform_source::{UniformSource, UniformSourceFactory};
