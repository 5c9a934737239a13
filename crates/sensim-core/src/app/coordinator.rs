//! Coordinator - 1 run のライフサイクルと shutdown の順序付け
//!
//! # Shutdown 順序
//! 1. cancel（外部 interrupt / duration 経過 / token.cancel() の早い方）
//! 2. producer barrier: 全 slot が Stopped になるまで待つ
//! 3. queue.close()（close を呼ぶのはここだけ）
//! 4. consumer barrier: aggregator → publisher の順で待つ
//! 5. broker.close()
//!
//! 2 → 3 → 4 の順序が「close 後に send しない」ことの根拠。
//!
//! publisher は primary queue を待たせない。aggregator からの fan-out は try_send で、
//! publisher が死ねば watcher が fan-out を close し、cancel 後の drain は
//! `publish_drain_timeout` で打ち切られる。
use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::aggregator::{Aggregator, AggregatorReport};
use super::publisher_loop::{PublisherLoop, PublisherReport};
use super::status::SimReport;
use super::supervisor::{SlotContext, supervise};
use crate::config::SimConfig;
use crate::domain::{ProducerId, RunId};
use crate::error::SimError;
use crate::ports::{BrokerClient, Clock, Metrics, SourceFactory};
use crate::queue::BoundedQueue;

/// A fully wired simulation, ready to run once. Built by `SimulationBuilder`.
pub struct Simulation {
    config: SimConfig,
    metrics: Arc<dyn Metrics>,
    clock: Arc<dyn Clock>,
    sources: Arc<dyn SourceFactory>,
    broker: Option<Arc<dyn BrokerClient>>,
    cancel: CancellationToken,
}

impl Simulation {
    pub(crate) fn new(
        config: SimConfig,
        metrics: Arc<dyn Metrics>,
        clock: Arc<dyn Clock>,
        sources: Arc<dyn SourceFactory>,
        broker: Option<Arc<dyn BrokerClient>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            metrics,
            clock,
            sources,
            broker,
            cancel,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Handle to the run's cancellation signal. Cancelling it starts the graceful shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until `interrupt` resolves or the configured duration elapses, then shut down
    /// in order and report.
    pub async fn run<F>(self, interrupt: F) -> Result<SimReport, SimError>
    where
        F: Future<Output = ()>,
    {
        let run_id = RunId::generate(self.clock.as_ref());
        let span = info_span!("simulation", run_id = %run_id);
        self.run_inner(run_id, interrupt).instrument(span).await
    }

    async fn run_inner<F>(self, run_id: RunId, interrupt: F) -> Result<SimReport, SimError>
    where
        F: Future<Output = ()>,
    {
        let config = &self.config;
        let last_id = config.producer_ids_end()?;
        let started_at = self.clock.now();
        let queue = Arc::new(BoundedQueue::new(config.queue_capacity));

        // consumers first, so producers never start against a queue nobody reads
        let publishing = config
            .enable_broker_publish
            .then(|| self.broker.clone())
            .flatten();
        let mut aggregator = Aggregator::new(
            Arc::clone(&queue),
            Arc::clone(&self.metrics),
            config.summary_interval,
        );
        let mut publisher_handle = None;
        let mut fanout = None;
        if let Some(broker) = &publishing {
            let tap = Arc::new(BoundedQueue::new(config.queue_capacity));
            aggregator = aggregator.with_fanout(Arc::clone(&tap));
            fanout = Some(Arc::clone(&tap));
            let publisher = PublisherLoop::new(
                Arc::clone(&tap),
                Arc::clone(broker),
                Arc::clone(&self.metrics),
                config.subject_prefix.clone(),
                config.publish_timeout,
                config.summary_interval,
            )
            .with_drain_timeout(config.publish_drain_timeout);
            let inner = tokio::spawn(
                publisher
                    .run(self.cancel.clone())
                    .instrument(info_span!("publisher", component = "publisher")),
            );
            // publisher がどう終わっても fan-out を閉じ、aggregator の hand-off を止める
            publisher_handle = Some(tokio::spawn(
                async move {
                    let joined = inner.await;
                    if tap.close() {
                        warn!("publisher exited before the fan-out closed; remaining readings are dropped");
                    }
                    joined
                }
                .in_current_span(),
            ));
        }
        let aggregator_handle = tokio::spawn(
            aggregator
                .run(self.cancel.clone())
                .instrument(info_span!("aggregator", component = "aggregator")),
        );

        let mut producers = JoinSet::new();
        for n in 1..=last_id {
            let ctx = SlotContext {
                id: ProducerId::new(n),
                interval: config.producer_interval,
                sources: Arc::clone(&self.sources),
                clock: Arc::clone(&self.clock),
                metrics: Arc::clone(&self.metrics),
            };
            producers.spawn(
                supervise(ctx, Arc::clone(&queue), self.cancel.clone()).instrument(info_span!(
                    "supervisor",
                    component = "supervisor",
                    producer_id = n
                )),
            );
        }

        info!(
            producers = config.producer_count,
            interval_ms = config.producer_interval.as_millis() as u64,
            capacity = config.queue_capacity,
            duration_secs = config.simulation_duration.as_secs(),
            publishing = publishing.is_some(),
            "simulation started"
        );

        tokio::select! {
            _ = interrupt => info!("shutdown signal received, starting graceful shutdown"),
            _ = time::sleep(config.simulation_duration) => info!("simulation duration elapsed, shutting down"),
            _ = self.cancel.cancelled() => info!("cancellation requested, shutting down"),
        }
        self.cancel.cancel();

        // producer barrier
        let mut slots = Vec::with_capacity(config.producer_count);
        let mut first_error = None;
        while let Some(joined) = producers.join_next().await {
            match joined {
                Ok(Ok(report)) => slots.push(report),
                Ok(Err(err)) => {
                    error!(error = %err, "fault barrier failed");
                    first_error.get_or_insert(SimError::Slot(err));
                }
                Err(err) => {
                    error!(error = %err, "fault barrier task failed");
                    first_error.get_or_insert(SimError::Other(err.to_string()));
                }
            }
        }

        if queue.close() {
            info!(buffered = queue.len(), "all producers stopped, queue closed");
        }

        // consumer barrier
        let aggregated = match aggregator_handle.await {
            Ok(report) => report,
            Err(err) => {
                error!(error = %err, "aggregator task failed");
                first_error.get_or_insert(SimError::Other(err.to_string()));
                AggregatorReport::default()
            }
        };
        // no-op after a normal aggregator exit; unblocks the publisher otherwise
        if let Some(tap) = &fanout {
            tap.close();
        }
        // publisher の喪失は run を失敗させない（primary pipeline は完走済み）
        let mut published: Option<PublisherReport> = None;
        if let Some(handle) = publisher_handle {
            match handle.await {
                Ok(Ok(report)) => published = Some(report),
                Ok(Err(err)) | Err(err) => {
                    error!(error = %err, "publisher task failed; its counts are missing from the report");
                }
            }
        }

        if let Some(broker) = &publishing {
            if let Err(err) = broker.close().await {
                warn!(error = %err, "broker close failed");
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        let report = SimReport::new(
            run_id,
            started_at,
            self.clock.now(),
            slots,
            aggregated,
            published,
        )
        .with_queue_stats(&queue);

        debug!(high_watermark = report.queue_high_watermark, "queue stats");
        if report.sends_after_close > 0 {
            error!(count = report.sends_after_close, "sends observed after queue close");
        }
        info!(
            sent = report.sent,
            received = report.received,
            restarts = report.restarts,
            dropped = report.dropped,
            "simulation ended gracefully"
        );
        Ok(report)
    }
}
