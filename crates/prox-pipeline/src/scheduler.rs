//! Recurring sweep: reclaim, purge, and drain the queue.
//!
//! Wakes on a fixed interval or when [`SweepTrigger::notify`] is called after
//! bulk mutations, and stops when the shutdown channel flips to `true`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use prox_core::errors::PipelineError;
use prox_core::responses::BatchReport;
use serde::Serialize;
use tokio::sync::{Notify, watch};

use crate::batch::BatchProcessor;
use crate::cache_policy::CachePolicy;
use crate::queue::WorkQueue;

/// Upper bound on batches per sweep so one sweep cannot starve shutdown.
const MAX_BATCHES_PER_SWEEP: usize = 100;

/// Cloneable handle that wakes the scheduler immediately.
#[derive(Clone, Default)]
pub struct SweepTrigger(Arc<Notify>);

impl SweepTrigger {
    pub fn notify(&self) {
        self.0.notify_one();
    }
}

/// Totals of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub reclaimed: u64,
    pub purged: u64,
    pub batches: usize,
    pub processed: usize,
    pub failed: usize,
    pub tripped: bool,
}

pub struct Scheduler {
    batch: BatchProcessor,
    queue: WorkQueue,
    cache: CachePolicy,
    interval: Duration,
    batch_size: usize,
    trigger: SweepTrigger,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        batch: BatchProcessor,
        queue: WorkQueue,
        cache: CachePolicy,
        interval: Duration,
        batch_size: usize,
    ) -> Self {
        Self {
            batch,
            queue,
            cache,
            interval,
            batch_size,
            trigger: SweepTrigger::default(),
        }
    }

    #[must_use]
    pub fn trigger(&self) -> SweepTrigger {
        self.trigger.clone()
    }

    /// One sweep: reclaim orphaned tasks, purge old cache rows, then run
    /// batches until the queue has no due work or the breaker trips.
    pub async fn sweep(&self) -> Result<SweepReport, PipelineError> {
        let mut report = SweepReport {
            reclaimed: self.queue.reclaim_stale().await?,
            purged: self.cache.purge_expired(Utc::now()).await?,
            ..SweepReport::default()
        };
        for _ in 0..MAX_BATCHES_PER_SWEEP {
            let BatchReport {
                processed,
                failed,
                tripped,
                ..
            } = self.batch.process_batch(self.batch_size).await?;
            if processed == 0 {
                break;
            }
            report.batches += 1;
            report.processed += processed;
            report.failed += failed;
            if tripped {
                report.tripped = true;
                break;
            }
            if processed < self.batch_size {
                break;
            }
        }
        Ok(report)
    }

    /// Sweep until `shutdown` carries `true` or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.interval.as_secs(), "scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = self.trigger.0.notified() => {
                    tracing::debug!("sweep triggered");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            match self.sweep().await {
                Ok(report) if report.processed > 0 || report.reclaimed > 0 => {
                    tracing::info!(
                        batches = report.batches,
                        processed = report.processed,
                        failed = report.failed,
                        reclaimed = report.reclaimed,
                        purged = report.purged,
                        tripped = report.tripped,
                        "sweep finished"
                    );
                }
                Ok(_) => {}
                Err(error) => tracing::error!(%error, "sweep failed"),
            }
        }
        tracing::info!("scheduler stopped");
    }
}
