//! SimulationBuilder - Simulation の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 省略された port は既定の実装で埋める（NoopMetrics, SystemClock, UniformSourceFactory）

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::coordinator::Simulation;
use crate::config::{ConfigError, SimConfig};
use crate::impls::UniformSourceFactory;
use crate::ports::{BrokerClient, Clock, Metrics, NoopMetrics, SourceFactory, SystemClock};

/// SimulationBuilder は Simulation を構築
///
/// # 使用例
/// ```ignore
/// let sim = SimulationBuilder::new(SimConfig::default())
///     .metrics(metrics)
///     .broker(broker)
///     .build()?;
/// let report = sim.run(wait_for_shutdown_signal()).await?;
/// ```
///
/// # Fail-fast 設計
/// - build() 時に SimConfig::validate() を実行
/// - enable_broker_publish なのに broker が無ければ BuildError
pub struct SimulationBuilder {
    config: SimConfig,
    metrics: Option<Arc<dyn Metrics>>,
    clock: Option<Arc<dyn Clock>>,
    sources: Option<Arc<dyn SourceFactory>>,
    broker: Option<Arc<dyn BrokerClient>>,
    cancel: Option<CancellationToken>,
}

/// BuildError は Simulation 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("broker publishing is enabled but no broker client was provided")]
    MissingBroker,
}

impl SimulationBuilder {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            metrics: None,
            clock: None,
            sources: None,
            broker: None,
            cancel: None,
        }
    }

    pub fn metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn sources(mut self, sources: Arc<dyn SourceFactory>) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Only used when `enable_broker_publish` is set.
    pub fn broker(mut self, broker: Arc<dyn BrokerClient>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Share an existing cancellation signal instead of creating a fresh one.
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn build(self) -> Result<Simulation, BuildError> {
        self.config.validate()?;
        if self.config.enable_broker_publish && self.broker.is_none() {
            return Err(BuildError::MissingBroker);
        }

        Ok(Simulation::new(
            self.config,
            self.metrics.unwrap_or_else(|| Arc::new(NoopMetrics)),
            self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            self.sources
                .unwrap_or_else(|| Arc::new(UniformSourceFactory::from_entropy())),
            self.broker,
            self.cancel.unwrap_or_default(),
        ))
    }
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}
