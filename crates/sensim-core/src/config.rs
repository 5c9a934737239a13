//! Simulation configuration.
//!
//! Loading (flags, env) is the binary's job; this module only holds the values,
//! their defaults and validation.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_SUBJECT_PREFIX: &str = "iot.sensors";
pub const DEFAULT_BROKER_URL: &str = "nats://127.0.0.1:4222";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("queue_capacity must be at least 1")]
    ZeroCapacity,

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("subject_prefix must not be empty")]
    EmptySubjectPrefix,

    #[error("producer_count {0} exceeds the producer id range")]
    TooManyProducers(usize),
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of producer slots (ids 1..=producer_count).
    pub producer_count: usize,

    /// Automatic cancellation after this long.
    pub simulation_duration: Duration,

    /// Tick period of every producer.
    pub producer_interval: Duration,

    /// Capacity C of the shared queue (and of the publisher fan-out queue).
    pub queue_capacity: usize,

    pub enable_broker_publish: bool,
    pub broker_url: String,
    pub subject_prefix: String,

    /// Upper bound for a single publish attempt.
    pub publish_timeout: Duration,

    /// After cancellation the publisher keeps publishing for at most this long; whatever
    /// is still buffered afterwards is counted as dropped. Zero drops immediately.
    pub publish_drain_timeout: Duration,

    /// Cadence of the aggregator and publisher summaries.
    pub summary_interval: Duration,

    /// Where the external metrics exposition binds. Carried, not served, by the core.
    pub metrics_bind_address: String,

    /// Where the external profiling endpoint binds. Carried, not served, by the core.
    pub profiling_bind_address: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            producer_count: 5000,
            simulation_duration: Duration::from_secs(10 * 60),
            producer_interval: Duration::from_millis(100),
            queue_capacity: 1000,
            enable_broker_publish: false,
            broker_url: DEFAULT_BROKER_URL.to_string(),
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
            publish_timeout: Duration::from_secs(2),
            publish_drain_timeout: Duration::from_secs(5),
            summary_interval: Duration::from_secs(5),
            metrics_bind_address: "0.0.0.0:2112".to_string(),
            profiling_bind_address: "127.0.0.1:6060".to_string(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.producer_ids_end()?;
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        for (name, value) in [
            ("producer_interval", self.producer_interval),
            ("summary_interval", self.summary_interval),
            ("publish_timeout", self.publish_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration(name));
            }
        }
        if self.subject_prefix.is_empty() {
            return Err(ConfigError::EmptySubjectPrefix);
        }
        Ok(())
    }

    /// Highest producer id, checked against the `ProducerId` range.
    pub fn producer_ids_end(&self) -> Result<u32, ConfigError> {
        u32::try_from(self.producer_count)
            .map_err(|_| ConfigError::TooManyProducers(self.producer_count))
    }
}
