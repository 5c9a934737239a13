//! sensim-core
//!
//! Core building blocks for the sensor simulation harness.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, reading, slot state machine, slot report）
//! - **ports**: 抽象化レイヤー（BrokerClient, Metrics, Clock, Source）
//! - **queue**: producers と consumers の間の bounded queue
//! - **app**: アプリケーションロジック（builder, coordinator, supervisor, producer, aggregator, publisher_loop）
//! - **impls**: 実装（InMemoryBroker, InMemoryMetrics, UniformSourceFactory）
//! - **config**: SimConfig と既定値
//! - **error**: エラー型

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod queue;

#[cfg(test)]
mod testing;

pub use app::{BuildError, SimReport, Simulation, SimulationBuilder};
pub use config::SimConfig;
pub use error::SimError;
