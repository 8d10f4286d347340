//! Work queue service: enqueue rules, affected-set fan-out, and task outcomes.
//!
//! Thin policy layer over the `work_queue` table. Exclusivity lives in the
//! database (partial unique index plus atomic claim); this type decides
//! what gets enqueued after a mutation and how a failure is classified.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use prox_config::{NearbyConfig, QueueConfig};
use prox_core::entities::{EntityRef, NewTask, QueueStats, QueueTask};
use prox_core::enums::{EntityType, TaskKind, TaskStatus};
use prox_core::errors::{CoreError, PipelineError};
use prox_core::store::EntityStore;
use prox_db::ProxDb;
use prox_db::repos::EnqueueOutcome;
use prox_db::retry::RetryConfig;

use crate::cache_policy::{CachePolicy, keys};

/// Priority used for tasks fanned out from a mutation.
pub const AFFECTED_PRIORITY: i64 = 0;

#[derive(Clone)]
pub struct WorkQueue {
    db: Arc<ProxDb>,
    store: Arc<dyn EntityStore>,
    cache: CachePolicy,
    nearby: NearbyConfig,
    retry: RetryConfig,
    lease: chrono::Duration,
}

impl WorkQueue {
    #[must_use]
    pub fn new(
        db: Arc<ProxDb>,
        store: Arc<dyn EntityStore>,
        cache: CachePolicy,
        queue: &QueueConfig,
        nearby: NearbyConfig,
    ) -> Self {
        Self {
            db,
            store,
            cache,
            nearby,
            retry: RetryConfig {
                max_attempts: queue.max_attempts,
                base_delay: std::time::Duration::from_secs(queue.backoff_base_secs),
                max_delay: std::time::Duration::from_secs(queue.backoff_max_secs),
            },
            lease: crate::seconds(queue.lease_secs),
        }
    }

    /// Enqueue a nearby recompute. Returns whether a new task was created.
    pub async fn enqueue(
        &self,
        entity_id: i64,
        entity_type: EntityType,
        priority: i64,
    ) -> Result<bool, PipelineError> {
        let outcome = self
            .enqueue_task(&NewTask::nearby(entity_id, entity_type, priority))
            .await?;
        Ok(outcome.is_created())
    }

    pub async fn enqueue_task(&self, task: &NewTask) -> Result<EnqueueOutcome, PipelineError> {
        Ok(self.db.enqueue_task(task, Utc::now()).await?)
    }

    /// Enqueue every origin whose nearby sets may have changed because
    /// `entity_id` was created, moved, or removed.
    ///
    /// Two sources are merged: the reverse index (origins that listed the
    /// entity at its previous position) and a superset-radius query around
    /// its current position. Their nearby entries are expired, not deleted,
    /// so they remain available as stale answers. Returns the number of
    /// tasks created.
    pub async fn enqueue_affected(
        &self,
        entity_id: i64,
        entity_type: EntityType,
    ) -> Result<usize, PipelineError> {
        let entity = EntityRef::new(entity_id, entity_type);
        let mut affected: BTreeSet<EntityRef> = self
            .db
            .origins_referencing(entity)
            .await?
            .into_iter()
            .collect();

        match self.store.get_entity(entity_id, entity_type).await {
            Ok(location) => {
                affected.insert(entity);
                if let Some(center) = location.coordinates {
                    let radius = self.nearby.superset_radius();
                    for candidate_type in EntityType::ALL {
                        for found in self
                            .store
                            .query_entities_in_radius(center, radius, candidate_type)
                            .await?
                        {
                            affected.insert(EntityRef::new(found.id, found.entity_type));
                        }
                    }
                }
            }
            Err(CoreError::NotFound { .. }) => {
                // Removed: its own sets are gone for good.
                self.cache
                    .invalidate(&keys::nearby_origin_pattern(entity))
                    .await?;
                self.db.remove_nearby_refs_for_origin(entity).await?;
                affected.remove(&entity);
            }
            Err(other) => return Err(other.into()),
        }

        let now = Utc::now();
        let mut created = 0;
        for origin in &affected {
            self.cache
                .expire(&keys::nearby_origin_pattern(*origin), now)
                .await?;
            let task = NewTask::nearby(origin.id, origin.entity_type, AFFECTED_PRIORITY);
            if self.db.enqueue_task(&task, now).await?.is_created() {
                created += 1;
            }
        }
        tracing::info!(
            entity_id,
            entity_type = %entity_type,
            affected = affected.len(),
            created,
            "affected origins enqueued"
        );
        Ok(created)
    }

    pub async fn claim_batch(&self, limit: usize) -> Result<Vec<QueueTask>, PipelineError> {
        let limit = u32::try_from(limit).unwrap_or(u32::MAX);
        Ok(self.db.claim_batch(limit, Utc::now()).await?)
    }

    /// Mark a task done. Returns `Pending` when a follow-up re-opened it.
    pub async fn complete(&self, task_id: i64) -> Result<TaskStatus, PipelineError> {
        Ok(self.db.complete_task(task_id, Utc::now()).await?)
    }

    /// Record a failure: retryable errors back off, input and config errors fail for good.
    pub async fn fail(
        &self,
        task: &QueueTask,
        error: &PipelineError,
    ) -> Result<TaskStatus, PipelineError> {
        let message = error.to_string();
        let now = Utc::now();
        let status = if error.is_retryable() {
            self.db.fail_task(task, &message, &self.retry, now).await?
        } else {
            self.db.fail_task_permanently(task, &message, now).await?
        };
        tracing::warn!(
            task_id = task.id,
            entity_id = task.entity_id,
            kind = %task.kind,
            error_kind = error.kind(),
            %status,
            "task failed: {message}"
        );
        Ok(status)
    }

    /// Return a claimed task untouched.
    pub async fn release(&self, task_id: i64) -> Result<(), PipelineError> {
        Ok(self.db.release_task(task_id, Utc::now()).await?)
    }

    /// Return a claimed task untouched, due again after `delay`.
    pub async fn postpone(
        &self,
        task_id: i64,
        delay: chrono::Duration,
    ) -> Result<(), PipelineError> {
        let now = Utc::now();
        Ok(self.db.postpone_task(task_id, now + delay, now).await?)
    }

    /// Return processing tasks whose lease ran out.
    pub async fn reclaim_stale(&self) -> Result<u64, PipelineError> {
        let reclaimed = self
            .db
            .reclaim_stale_tasks(self.lease, self.retry.max_attempts, Utc::now())
            .await?;
        if reclaimed > 0 {
            tracing::warn!(reclaimed, "stale processing tasks reclaimed");
        }
        Ok(reclaimed)
    }

    pub async fn requeue_failed(&self, kind: Option<TaskKind>) -> Result<u64, PipelineError> {
        Ok(self.db.requeue_failed(kind, Utc::now()).await?)
    }

    pub async fn stats(&self) -> Result<QueueStats, PipelineError> {
        Ok(self.db.queue_stats(Utc::now()).await?)
    }
}
