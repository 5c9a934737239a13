//! Supervisor - per-slot fault barrier
//!
//! 1 slot = 1 supervisor。producer の 1 run を別タスクとして spawn し、
//! panic は JoinError として受け取る（プロセス全体には波及しない）。
//!
//! # フロー
//! 1. cancel 済みなら停止
//! 2. SourceFactory から新しい Source を作って run を spawn
//! 3. 正常終了 → 停止 / panic → fault 記録 → cancel 確認 → 再起動 or 停止
//!
//! cancel 確認は fault の直後に必ず行うので、cancel 後の再起動は高々 1 回。

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};

use super::producer::Producer;
use crate::domain::{ProducerId, Slot, SlotReport, SlotState};
use crate::error::SlotError;
use crate::ports::{Clock, Metrics, SourceFactory};
use crate::queue::BoundedQueue;

/// Everything a fault barrier needs to (re)create its producer.
#[derive(Clone)]
pub struct SlotContext {
    pub id: ProducerId,
    pub interval: Duration,
    pub sources: Arc<dyn SourceFactory>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Arc<dyn Metrics>,
}

/// Run producer `ctx.id` until cancellation, restarting it after every fault.
///
/// Returns once the current run has fully exited, so awaiting every slot's supervisor
/// is a completion barrier for all producer activity.
pub async fn supervise(
    ctx: SlotContext,
    queue: Arc<BoundedQueue>,
    cancel: CancellationToken,
) -> Result<SlotReport, SlotError> {
    let sent = Arc::new(AtomicU64::new(0));
    let mut slot = Slot::new(ctx.id);

    while !cancel.is_cancelled() {
        let producer = Producer::new(
            ctx.id,
            ctx.interval,
            ctx.sources.create(ctx.id),
            Arc::clone(&ctx.clock),
            Arc::clone(&ctx.metrics),
            Arc::clone(&sent),
        );

        slot.start_run()?;
        ctx.metrics.producer_started(ctx.id);
        let joined = tokio::spawn(
            producer
                .run(Arc::clone(&queue), cancel.clone())
                .in_current_span(),
        )
        .await;
        ctx.metrics.producer_stopped(ctx.id);

        match joined {
            Ok(Ok(())) => break,
            Ok(Err(err)) => {
                // queue closed under a live producer: shutdown ordering broken, do not retry
                error!(producer_id = %ctx.id, error = %err, "producer send rejected; stopping slot");
                break;
            }
            Err(join_err) => {
                let payload = match join_err.try_into_panic() {
                    Ok(payload) => payload,
                    Err(join_err) => {
                        warn!(producer_id = %ctx.id, error = %join_err, "producer task aborted");
                        break;
                    }
                };

                let fault = slot.record_fault(panic_message(payload.as_ref()))?;
                ctx.metrics.producer_restarted(ctx.id);
                warn!(
                    producer_id = %fault.producer_id,
                    attempt = fault.attempt,
                    error = %fault.message,
                    "producer faulted"
                );

                if cancel.is_cancelled() {
                    debug!(producer_id = %ctx.id, "cancelled; not restarting");
                    break;
                }
                slot.transition(SlotState::Starting)?;
                info!(producer_id = %ctx.id, restarts = slot.restarts(), "restarting producer");
            }
        }
    }

    slot.stop()?;
    Ok(slot.into_report(sent.load(Ordering::Relaxed)))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
