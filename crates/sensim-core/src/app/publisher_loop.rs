//! PublisherLoop - reading を broker に転送
//!
//! # フロー
//! 1. fan-out queue から recv（closed + empty で終了）
//! 2. is_connected を確認（未接続なら即失敗としてカウント）
//! 3. `<prefix>.data.<id>` へ JSON を publish（timeout 付き）
//! 4. 成功/失敗（reason 別）と latency を Metrics に記録
//!
//! 失敗は 1 件ごとに完結する。リトライはしない。
//!
//! cancel 後は drain deadline まで publish を続ける。deadline を過ぎたら in-flight の
//! publish も打ち切り、残りは `dropped` として数えるだけにする。

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::aggregator::DROPPED;
use crate::domain::Reading;
use crate::ports::{BrokerClient, Metrics, PublishError};
use crate::queue::BoundedQueue;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublisherReport {
    pub success: u64,
    pub failures: u64,

    /// Readings discarded unpublished once the drain deadline passed.
    pub dropped: u64,
}

impl PublisherReport {
    pub fn attempted(&self) -> u64 {
        self.success + self.failures
    }
}

pub struct PublisherLoop {
    queue: Arc<BoundedQueue>,
    broker: Arc<dyn BrokerClient>,
    metrics: Arc<dyn Metrics>,
    subject_prefix: String,
    publish_timeout: Duration,
    stats_interval: Duration,
    drain_timeout: Option<Duration>,
}

impl PublisherLoop {
    pub fn new(
        queue: Arc<BoundedQueue>,
        broker: Arc<dyn BrokerClient>,
        metrics: Arc<dyn Metrics>,
        subject_prefix: impl Into<String>,
        publish_timeout: Duration,
        stats_interval: Duration,
    ) -> Self {
        Self {
            queue,
            broker,
            metrics,
            subject_prefix: subject_prefix.into(),
            publish_timeout,
            stats_interval,
            drain_timeout: None,
        }
    }

    /// Bound the post-cancel drain. Without it the loop publishes until the fan-out
    /// is closed and empty.
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = Some(drain_timeout);
        self
    }

    pub async fn run(self, cancel: CancellationToken) -> PublisherReport {
        let mut stats =
            time::interval_at(Instant::now() + self.stats_interval, self.stats_interval);
        stats.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let expired = drain_deadline(cancel.clone(), self.drain_timeout);
        tokio::pin!(expired);

        let mut report = PublisherReport::default();
        let mut draining = false;
        let mut abandoned = false;

        info!(prefix = %self.subject_prefix, "publisher starting");
        self.metrics.broker_connection(self.broker.is_connected());

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled(), if !draining => {
                    draining = true;
                    debug!(buffered = self.queue.len(), "cancellation observed; draining fan-out");
                }
                _ = &mut expired, if !abandoned => {
                    abandoned = true;
                    warn!(buffered = self.queue.len(), "drain deadline passed; dropping unpublished readings");
                }
                _ = stats.tick() => {
                    let connected = self.broker.is_connected();
                    self.metrics.broker_connection(connected);
                    info!(
                        success = report.success,
                        failures = report.failures,
                        dropped = report.dropped,
                        connected,
                        "publisher stats"
                    );
                }
                next = self.queue.recv() => {
                    let Some(reading) = next else { break };
                    let outcome = if abandoned {
                        None
                    } else {
                        tokio::select! {
                            biased;
                            result = self.publish(&reading) => Some(result),
                            _ = &mut expired => {
                                abandoned = true;
                                warn!(producer_id = %reading.producer_id, "drain deadline passed mid-publish; dropping unpublished readings");
                                None
                            }
                        }
                    };
                    match outcome {
                        None => {
                            report.dropped += 1;
                            self.metrics.publish_failed(reading.producer_id, DROPPED);
                        }
                        Some(Ok(())) => {
                            report.success += 1;
                            self.metrics.publish_succeeded(reading.producer_id);
                        }
                        Some(Err(err)) => {
                            report.failures += 1;
                            self.metrics.publish_failed(reading.producer_id, err.reason());
                            // connectivity is already surfaced by the periodic stats
                            if err == PublishError::NotConnected {
                                debug!(producer_id = %reading.producer_id, "publish skipped: broker not connected");
                            } else {
                                warn!(producer_id = %reading.producer_id, error = %err, "publish failed");
                            }
                        }
                    }
                }
            }
        }

        self.metrics.broker_connection(self.broker.is_connected());
        info!(
            attempted = report.attempted(),
            success = report.success,
            failures = report.failures,
            dropped = report.dropped,
            "publisher stopping"
        );
        report
    }

    async fn publish(&self, reading: &Reading) -> Result<(), PublishError> {
        if !self.broker.is_connected() {
            return Err(PublishError::NotConnected);
        }

        let subject = reading.subject(&self.subject_prefix);
        let payload = reading
            .to_json()
            .map_err(|e| PublishError::Encode(e.to_string()))?;

        let started = Instant::now();
        let result = match time::timeout(
            self.publish_timeout,
            self.broker.publish(&subject, payload),
        )
        .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(PublishError::Timeout(self.publish_timeout)),
        };
        self.metrics
            .publish_latency(reading.producer_id, started.elapsed());
        result
    }
}

/// Resolves `grace` after cancellation; never resolves when unbounded.
async fn drain_deadline(cancel: CancellationToken, grace: Option<Duration>) {
    cancel.cancelled().await;
    match grace {
        Some(grace) if grace.is_zero() => {}
        Some(grace) => time::sleep(grace).await,
        None => std::future::pending().await,
    }
}
