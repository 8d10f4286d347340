//! Batch processor: drains the work queue in bounded batches.
//!
//! Tasks are handled one after another in claim order. A soft circuit
//! breaker stops the batch when the same error repeats across consecutive
//! tasks (an upstream outage, a broken config) and hands the remaining
//! claimed tasks back to the queue untouched.
//!
//! Nearby and isochrone tasks take the same per-origin lock as on-demand
//! requests. A task whose lock is busy is postponed without counting an
//! attempt; one whose results were written after it was enqueued is
//! completed without recomputing.

use chrono::{DateTime, Utc};
use prox_core::entities::{EntityRef, QueueTask};
use prox_core::enums::{TaskKind, TaskStatus};
use prox_core::errors::PipelineError;
use prox_core::responses::BatchReport;

use crate::cache_policy::keys;
use crate::discovery::{DiscoveryEngine, DiscoveryOptions};
use crate::isochrone::{IsochroneRequest, IsochroneService};
use crate::lock::ComputeLocks;
use crate::nearby::NearbyService;
use crate::queue::WorkQueue;

#[derive(Clone)]
pub struct BatchProcessor {
    queue: WorkQueue,
    nearby: NearbyService,
    isochrone: IsochroneService,
    discovery: DiscoveryEngine,
    locks: ComputeLocks,
    busy_delay: chrono::Duration,
    breaker_threshold: usize,
}

/// What running one task amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ran {
    Computed,
    /// Results were already refreshed after the task was enqueued.
    Skipped,
    /// Another worker holds the origin's lock.
    Busy,
}

/// Tracks consecutive identical failures.
#[derive(Default)]
struct Breaker {
    last: Option<String>,
    streak: usize,
}

impl Breaker {
    /// Record a failure; returns true when the streak reaches `threshold`.
    fn failure(&mut self, error: &PipelineError, threshold: usize) -> bool {
        let signature = format!("{}: {error}", error.kind());
        if self.last.as_deref() == Some(signature.as_str()) {
            self.streak += 1;
        } else {
            self.last = Some(signature);
            self.streak = 1;
        }
        self.streak >= threshold
    }

    fn success(&mut self) {
        self.last = None;
        self.streak = 0;
    }
}

impl BatchProcessor {
    #[must_use]
    pub const fn new(
        queue: WorkQueue,
        nearby: NearbyService,
        isochrone: IsochroneService,
        discovery: DiscoveryEngine,
        locks: ComputeLocks,
        busy_delay: chrono::Duration,
        breaker_threshold: usize,
    ) -> Self {
        Self {
            queue,
            nearby,
            isochrone,
            discovery,
            locks,
            busy_delay,
            breaker_threshold,
        }
    }

    /// Claim up to `batch_size` tasks and run them.
    ///
    /// # Errors
    ///
    /// Only database failures while claiming or recording outcomes; task
    /// errors are recorded on the task and counted in the report.
    pub async fn process_batch(&self, batch_size: usize) -> Result<BatchReport, PipelineError> {
        let tasks = self.queue.claim_batch(batch_size).await?;
        let mut report = BatchReport::default();
        let mut breaker = Breaker::default();

        let mut remaining = tasks.into_iter();
        for task in remaining.by_ref() {
            report.processed += 1;
            match self.run(&task).await {
                Ok(Ran::Busy) => {
                    report.postponed += 1;
                    self.queue.postpone(task.id, self.busy_delay).await?;
                    tracing::debug!(task_id = task.id, "origin locked elsewhere, task postponed");
                }
                Ok(ran) => {
                    if ran == Ran::Skipped {
                        report.skipped += 1;
                    } else {
                        report.succeeded += 1;
                    }
                    breaker.success();
                    if self.queue.complete(task.id).await? == TaskStatus::Pending {
                        tracing::debug!(task_id = task.id, "task re-opened for follow-up");
                    }
                }
                Err(error) => {
                    report.failed += 1;
                    self.queue.fail(&task, &error).await?;
                    if breaker.failure(&error, self.breaker_threshold) {
                        report.tripped = true;
                        report.message = format!(
                            "stopped after {} consecutive failures: {error}",
                            breaker.streak
                        );
                        break;
                    }
                }
            }
        }

        for task in remaining {
            self.queue.release(task.id).await?;
            report.released += 1;
        }

        if report.tripped {
            tracing::warn!(
                processed = report.processed,
                released = report.released,
                "batch circuit breaker tripped: {}",
                report.message
            );
        } else {
            report.message = format!(
                "processed {} tasks: {} succeeded, {} skipped, {} postponed, {} failed",
                report.processed, report.succeeded, report.skipped, report.postponed, report.failed
            );
            if report.processed > 0 {
                tracing::info!(
                    processed = report.processed,
                    succeeded = report.succeeded,
                    skipped = report.skipped,
                    postponed = report.postponed,
                    failed = report.failed,
                    "batch finished"
                );
            }
        }
        Ok(report)
    }

    async fn run(&self, task: &QueueTask) -> Result<Ran, PipelineError> {
        let origin = EntityRef::new(task.entity_id, task.entity_type);
        match task.kind {
            TaskKind::Nearby => {
                let Some(guard) = self.locks.acquire(&keys::nearby_lock(origin)).await? else {
                    return Ok(Ran::Busy);
                };
                let result = self.refresh_nearby(origin, task.enqueued_at).await;
                guard.release().await;
                result
            }
            TaskKind::Isochrone => {
                let request = self
                    .isochrone
                    .request_from_payload(task.payload.as_ref())?;
                let lock = keys::isochrone_lock(origin, &request.profile);
                let Some(guard) = self.locks.acquire(&lock).await? else {
                    return Ok(Ran::Busy);
                };
                let result = self
                    .refresh_isochrones(origin, &request, task.enqueued_at)
                    .await;
                guard.release().await;
                result
            }
            TaskKind::Discovery => {
                let options = DiscoveryOptions::from_payload(task.payload.as_ref())?;
                self.discovery.discover(origin, options).await?;
                Ok(Ran::Computed)
            }
        }
    }

    async fn refresh_nearby(
        &self,
        origin: EntityRef,
        enqueued_at: DateTime<Utc>,
    ) -> Result<Ran, PipelineError> {
        if self.nearby.fresh_since(origin, enqueued_at).await? {
            return Ok(Ran::Skipped);
        }
        self.nearby.compute(origin).await?;
        Ok(Ran::Computed)
    }

    async fn refresh_isochrones(
        &self,
        origin: EntityRef,
        request: &IsochroneRequest,
        enqueued_at: DateTime<Utc>,
    ) -> Result<Ran, PipelineError> {
        if self
            .isochrone
            .fresh_since(origin, request, enqueued_at)
            .await?
        {
            return Ok(Ran::Skipped);
        }
        self.isochrone.compute(origin, request).await?;
        Ok(Ran::Computed)
    }
}
