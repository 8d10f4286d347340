//! Request-triggered processing under a time budget.
//!
//! ```text
//! Checking ──fresh──────────────────────────────► Ready
//!    │
//!    └─absent/expired─► lock? ──yes─► Computing ──done in budget──► Ready
//!                         │               │ └────input/config error──► Failed
//!                         │               └──budget exceeded──► Deferred
//!                         └──no (held elsewhere)──────────────► Deferred
//! ```
//!
//! The computation runs on its own task. A caller that stops waiting does
//! not cancel it: it finishes, fills the cache, and releases the lock.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use prox_config::OnDemandConfig;
use prox_core::entities::{EntityRef, IsochroneSet, NearbySet, NewTask};
use prox_core::enums::{EntityType, TaskKind};
use prox_core::errors::PipelineError;
use prox_core::responses::Outcome;

use crate::cache_policy::{Lookup, keys};
use crate::isochrone::{IsochroneRequest, IsochroneService};
use crate::lock::ComputeLocks;
use crate::nearby::NearbyService;
use crate::queue::WorkQueue;
use crate::token::ProcessTokens;

/// Deferred on-demand work jumps ahead of mutation fan-out.
pub const ON_DEMAND_PRIORITY: i64 = 10;

#[derive(Clone)]
pub struct OnDemandProcessor {
    locks: ComputeLocks,
    queue: WorkQueue,
    nearby: NearbyService,
    isochrone: IsochroneService,
    tokens: ProcessTokens,
    budget: Duration,
    retry_after_secs: u64,
}

impl OnDemandProcessor {
    #[must_use]
    pub fn new(
        locks: ComputeLocks,
        queue: WorkQueue,
        nearby: NearbyService,
        isochrone: IsochroneService,
        config: &OnDemandConfig,
    ) -> Self {
        Self {
            locks,
            queue,
            nearby,
            isochrone,
            tokens: ProcessTokens::new(config.token_secret.clone(), config.token_validity_secs),
            budget: Duration::from_millis(config.time_budget_ms),
            retry_after_secs: config.retry_after_secs,
        }
    }

    #[must_use]
    pub const fn tokens(&self) -> &ProcessTokens {
        &self.tokens
    }

    /// Nearby sets of `origin`, from cache or computed within the budget.
    pub async fn nearby(
        &self,
        origin: EntityRef,
        target: Option<EntityType>,
        limit: Option<usize>,
    ) -> Result<Outcome<Vec<NearbySet>>, PipelineError> {
        let targets = match self.nearby.targets(target) {
            Ok(targets) => targets,
            Err(err) => return Ok(Outcome::Failed { reason: err.to_string() }),
        };
        let stale = match self.nearby.cached(origin, &targets).await? {
            Lookup::Fresh(sets) => {
                return Ok(Outcome::Ready {
                    data: select(sets, &targets, limit),
                });
            }
            lookup => lookup.any(),
        };
        Ok(self
            .compute_nearby(origin, stale)
            .await?
            .map(|sets| select(sets, &targets, limit)))
    }

    /// Synchronous recompute of every nearby set, authorized by a process token.
    ///
    /// Skips the freshness check; the caller asked for a recompute.
    pub async fn process(
        &self,
        origin: EntityRef,
        token: &str,
    ) -> Result<Outcome<Vec<NearbySet>>, PipelineError> {
        if let Err(err) = self.tokens.verify(origin, token, Utc::now()) {
            tracing::warn!(origin_id = origin.id, origin_type = %origin.entity_type, %err, "process token rejected");
            return Ok(Outcome::Failed { reason: err.to_string() });
        }
        let targets = match self.nearby.targets(None) {
            Ok(targets) => targets,
            Err(err) => return Ok(Outcome::Failed { reason: err.to_string() }),
        };
        let stale = self.nearby.cached(origin, &targets).await?.any();
        self.compute_nearby(origin, stale).await
    }

    /// Isochrones of `origin`; `request` defaults to the configured profile and ranges.
    pub async fn isochrone(
        &self,
        origin: EntityRef,
        request: Option<IsochroneRequest>,
    ) -> Result<Outcome<IsochroneSet>, PipelineError> {
        let request = match request.map_or_else(|| self.isochrone.default_request(), Ok) {
            Ok(request) => request,
            Err(err) => return Ok(Outcome::Failed { reason: err.to_string() }),
        };
        let stale = match self.isochrone.cached(origin, &request).await? {
            Lookup::Fresh(set) => return Ok(Outcome::Ready { data: set }),
            lookup => lookup.any(),
        };

        let task = NewTask::nearby(origin.id, origin.entity_type, ON_DEMAND_PRIORITY)
            .with_kind(TaskKind::Isochrone)
            .with_payload(request.to_payload());
        let service = self.isochrone.clone();
        let lock = keys::isochrone_lock(origin, &request.profile);
        self.run_budgeted(&lock, task, stale, async move {
            service.compute(origin, &request).await
        })
        .await
    }

    async fn compute_nearby(
        &self,
        origin: EntityRef,
        stale: Option<Vec<NearbySet>>,
    ) -> Result<Outcome<Vec<NearbySet>>, PipelineError> {
        let task = NewTask::nearby(origin.id, origin.entity_type, ON_DEMAND_PRIORITY);
        let service = self.nearby.clone();
        self.run_budgeted(&keys::nearby_lock(origin), task, stale, async move {
            service.compute(origin).await
        })
        .await
    }

    async fn run_budgeted<T, F>(
        &self,
        lock_key: &str,
        task: NewTask,
        stale: Option<T>,
        compute: F,
    ) -> Result<Outcome<T>, PipelineError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, PipelineError>> + Send + 'static,
    {
        let Some(guard) = self.locks.acquire(lock_key).await? else {
            return self
                .defer("computation already in progress".into(), &task, stale)
                .await;
        };

        let handle = tokio::spawn(async move {
            let result = compute.await;
            guard.release().await;
            result
        });

        match tokio::time::timeout(self.budget, handle).await {
            Ok(Ok(Ok(data))) => Ok(Outcome::Ready { data }),
            Ok(Ok(Err(err))) if err.is_retryable() => {
                tracing::warn!(entity_id = task.entity_id, kind = %task.kind, %err, "on-demand computation failed; deferring");
                self.defer(err.to_string(), &task, stale).await
            }
            Ok(Ok(Err(err))) => Ok(Outcome::Failed {
                reason: err.to_string(),
            }),
            Ok(Err(join)) => Ok(Outcome::Failed {
                reason: format!("computation aborted: {join}"),
            }),
            Err(_) => {
                let err = PipelineError::Capacity {
                    budget_ms: u64::try_from(self.budget.as_millis()).unwrap_or(u64::MAX),
                };
                tracing::debug!(entity_id = task.entity_id, kind = %task.kind, "{err}");
                self.defer(err.to_string(), &task, stale).await
            }
        }
    }

    async fn defer<T>(
        &self,
        reason: String,
        task: &NewTask,
        stale: Option<T>,
    ) -> Result<Outcome<T>, PipelineError> {
        self.queue.enqueue_task(task).await?;
        Ok(Outcome::Deferred {
            reason,
            retry_after_secs: self.retry_after_secs,
            stale,
        })
    }
}

/// Keep the requested targets and cap each set at `limit`.
fn select(sets: Vec<NearbySet>, targets: &[EntityType], limit: Option<usize>) -> Vec<NearbySet> {
    sets.into_iter()
        .filter(|s| targets.contains(&s.candidate_type))
        .map(|s| s.limited(limit))
        .collect()
}
