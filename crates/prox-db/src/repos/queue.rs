//! Work queue repository: enqueue, atomic claim, and task lifecycle.
//!
//! The partial unique index `idx_work_queue_active` allows one pending or
//! processing row per `(entity_id, entity_type, kind)`. Every transition
//! below is a single `UPDATE … WHERE status = …` so two workers can never
//! move the same task.

use chrono::{DateTime, Utc};

use prox_core::entities::{NewTask, QueueStats, QueueTask};
use prox_core::enums::{TaskKind, TaskStatus};

use crate::ProxDb;
use crate::error::DatabaseError;
use crate::helpers::{
    age_secs, fmt_ts, get_opt_string, parse_datetime, parse_enum, parse_optional_json, to_json,
    to_u32, to_u64,
};
use crate::retry::RetryConfig;

const SELECT_COLS: &str = "id, entity_id, entity_type, kind, payload, priority, status, \
     attempts, follow_up, last_error, available_at, enqueued_at, updated_at";

fn row_to_task(row: &libsql::Row) -> Result<QueueTask, DatabaseError> {
    Ok(QueueTask {
        id: row.get(0)?,
        entity_id: row.get(1)?,
        entity_type: parse_enum(&row.get::<String>(2)?)?,
        kind: parse_enum(&row.get::<String>(3)?)?,
        payload: parse_optional_json(get_opt_string(row, 4)?.as_deref())?,
        priority: row.get(5)?,
        status: parse_enum(&row.get::<String>(6)?)?,
        attempts: to_u32(row.get::<i64>(7)?),
        follow_up: row.get::<i64>(8)? != 0,
        last_error: get_opt_string(row, 9)?,
        available_at: parse_datetime(&row.get::<String>(10)?)?,
        enqueued_at: parse_datetime(&row.get::<String>(11)?)?,
        updated_at: parse_datetime(&row.get::<String>(12)?)?,
    })
}

/// What `enqueue_task` did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A new pending task was created.
    Created(i64),
    /// A pending task already existed; its priority was raised if lower.
    AlreadyPending(i64),
    /// The entity is being processed; the running task will re-open when done.
    FollowUpScheduled(i64),
}

impl EnqueueOutcome {
    #[must_use]
    pub const fn is_created(self) -> bool {
        matches!(self, Self::Created(_))
    }

    #[must_use]
    pub const fn task_id(self) -> i64 {
        match self {
            Self::Created(id) | Self::AlreadyPending(id) | Self::FollowUpScheduled(id) => id,
        }
    }
}

/// Filter for [`ProxDb::list_tasks`].
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub kind: Option<TaskKind>,
    pub limit: Option<u32>,
}

impl ProxDb {
    /// Enqueue a task, coalescing with any active task for the same entity and kind.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on query failure, or `InvalidState` if the
    /// active row keeps vanishing between the insert and the update.
    pub async fn enqueue_task(
        &self,
        task: &NewTask,
        now: DateTime<Utc>,
    ) -> Result<EnqueueOutcome, DatabaseError> {
        let payload = task.payload.as_ref().map(to_json).transpose()?;
        let now_s = fmt_ts(now);

        // The active row can complete between the two statements; a couple
        // of rounds always settle it.
        for _ in 0..3 {
            let mut rows = self
                .conn()
                .query(
                    "INSERT INTO work_queue
                        (entity_id, entity_type, kind, payload, priority, status, attempts,
                         follow_up, available_at, enqueued_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 'pending', 0, 0, ?6, ?6, ?6)
                     ON CONFLICT DO NOTHING
                     RETURNING id",
                    libsql::params![
                        task.entity_id,
                        task.entity_type.as_str(),
                        task.kind.as_str(),
                        payload.clone(),
                        task.priority,
                        now_s.as_str()
                    ],
                )
                .await?;
            if let Some(row) = rows.next().await? {
                let id: i64 = row.get(0)?;
                tracing::debug!(
                    task_id = id,
                    entity_id = task.entity_id,
                    entity_type = %task.entity_type,
                    kind = %task.kind,
                    "task enqueued"
                );
                return Ok(EnqueueOutcome::Created(id));
            }

            let mut rows = self
                .conn()
                .query(
                    "UPDATE work_queue SET
                        priority = CASE
                            WHEN status = 'pending' AND ?4 > priority THEN ?4
                            ELSE priority END,
                        follow_up = CASE WHEN status = 'processing' THEN 1 ELSE follow_up END,
                        payload = COALESCE(?5, payload),
                        updated_at = CASE WHEN status = 'pending' THEN ?6 ELSE updated_at END
                     WHERE entity_id = ?1 AND entity_type = ?2 AND kind = ?3
                       AND status IN ('pending', 'processing')
                     RETURNING id, status",
                    libsql::params![
                        task.entity_id,
                        task.entity_type.as_str(),
                        task.kind.as_str(),
                        task.priority,
                        payload.clone(),
                        now_s.as_str()
                    ],
                )
                .await?;
            if let Some(row) = rows.next().await? {
                let id: i64 = row.get(0)?;
                let status: TaskStatus = parse_enum(&row.get::<String>(1)?)?;
                return Ok(if status == TaskStatus::Processing {
                    EnqueueOutcome::FollowUpScheduled(id)
                } else {
                    EnqueueOutcome::AlreadyPending(id)
                });
            }
        }

        Err(DatabaseError::InvalidState(format!(
            "could not enqueue {} task for {} {}",
            task.kind, task.entity_type, task.entity_id
        )))
    }

    /// Claim up to `limit` due pending tasks in one atomic statement.
    ///
    /// Order: priority desc, enqueue time asc, entity id asc.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn claim_batch(
        &self,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<QueueTask>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "UPDATE work_queue
                     SET status = 'processing', follow_up = 0, updated_at = ?1
                     WHERE id IN (
                        SELECT id FROM work_queue
                        WHERE status = 'pending' AND available_at <= ?1
                        ORDER BY priority DESC, enqueued_at ASC, entity_id ASC
                        LIMIT ?2
                     )
                     RETURNING {SELECT_COLS}"
                ),
                libsql::params![fmt_ts(now), i64::from(limit)],
            )
            .await?;

        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            tasks.push(row_to_task(&row)?);
        }
        // RETURNING order is unspecified.
        tasks.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.enqueued_at.cmp(&b.enqueued_at))
                .then(a.entity_id.cmp(&b.entity_id))
                .then(a.id.cmp(&b.id))
        });
        Ok(tasks)
    }

    /// Mark a processing task done, or re-open it when a follow-up was requested.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the task is not processing.
    pub async fn complete_task(
        &self,
        task_id: i64,
        now: DateTime<Utc>,
    ) -> Result<TaskStatus, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "UPDATE work_queue SET
                    status = CASE WHEN follow_up = 1 THEN 'pending' ELSE 'done' END,
                    attempts = CASE WHEN follow_up = 1 THEN 0 ELSE attempts END,
                    available_at = CASE WHEN follow_up = 1 THEN ?2 ELSE available_at END,
                    enqueued_at = CASE WHEN follow_up = 1 THEN ?2 ELSE enqueued_at END,
                    follow_up = 0,
                    last_error = NULL,
                    updated_at = ?2
                 WHERE id = ?1 AND status = 'processing'
                 RETURNING status",
                libsql::params![task_id, fmt_ts(now)],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| not_processing(task_id))?;
        parse_enum(&row.get::<String>(0)?)
    }

    /// Record a retryable failure.
    ///
    /// Re-opens the task with backoff while attempts remain, otherwise marks it
    /// failed. A pending follow-up always re-opens it with a fresh attempt count.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the task is not processing.
    pub async fn fail_task(
        &self,
        task: &QueueTask,
        error: &str,
        retry: &RetryConfig,
        now: DateTime<Utc>,
    ) -> Result<TaskStatus, DatabaseError> {
        let attempts = task.attempts.saturating_add(1);
        let exhausted = !retry.allows_retry(attempts);
        let delay = chrono::Duration::from_std(retry.delay_for(attempts))
            .map_err(|e| DatabaseError::Other(e.into()))?;
        self.finish_failed(task.id, attempts, exhausted, error, now + delay, now)
            .await
    }

    /// Record a non-retryable failure (bad input). Only a follow-up re-opens it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the task is not processing.
    pub async fn fail_task_permanently(
        &self,
        task: &QueueTask,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<TaskStatus, DatabaseError> {
        let attempts = task.attempts.saturating_add(1);
        self.finish_failed(task.id, attempts, true, error, now, now)
            .await
    }

    async fn finish_failed(
        &self,
        task_id: i64,
        attempts: u32,
        exhausted: bool,
        error: &str,
        retry_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<TaskStatus, DatabaseError> {
        let now_s = fmt_ts(now);
        let mut rows = self
            .conn()
            .query(
                "UPDATE work_queue SET
                    status = CASE
                        WHEN follow_up = 1 THEN 'pending'
                        WHEN ?3 = 1 THEN 'failed'
                        ELSE 'pending' END,
                    attempts = CASE WHEN follow_up = 1 THEN 0 ELSE ?2 END,
                    available_at = CASE
                        WHEN follow_up = 1 THEN ?6
                        WHEN ?3 = 1 THEN available_at
                        ELSE ?5 END,
                    enqueued_at = CASE WHEN follow_up = 1 THEN ?6 ELSE enqueued_at END,
                    follow_up = 0,
                    last_error = ?4,
                    updated_at = ?6
                 WHERE id = ?1 AND status = 'processing'
                 RETURNING status",
                libsql::params![
                    task_id,
                    i64::from(attempts),
                    i64::from(exhausted),
                    error,
                    fmt_ts(retry_at),
                    now_s
                ],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| not_processing(task_id))?;
        let status: TaskStatus = parse_enum(&row.get::<String>(0)?)?;
        tracing::debug!(task_id, attempts, %status, error, "task failed");
        Ok(status)
    }

    /// Return a claimed but unprocessed task to pending without counting an attempt.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the task is not processing.
    pub async fn release_task(&self, task_id: i64, now: DateTime<Utc>) -> Result<(), DatabaseError> {
        self.reopen_unprocessed(task_id, None, now).await
    }

    /// Like [`ProxDb::release_task`], but the task is not due again before `until`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the task is not processing.
    pub async fn postpone_task(
        &self,
        task_id: i64,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.reopen_unprocessed(task_id, Some(until), now).await
    }

    async fn reopen_unprocessed(
        &self,
        task_id: i64,
        until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE work_queue SET
                    status = 'pending',
                    available_at = COALESCE(?3, available_at),
                    enqueued_at = CASE WHEN follow_up = 1 THEN ?2 ELSE enqueued_at END,
                    follow_up = 0,
                    updated_at = ?2
                 WHERE id = ?1 AND status = 'processing'",
                libsql::params![task_id, fmt_ts(now), until.map(fmt_ts)],
            )
            .await?;
        if affected == 0 {
            return Err(not_processing(task_id));
        }
        Ok(())
    }

    /// Return processing tasks whose worker has been silent longer than `lease`.
    ///
    /// Counts as an attempt, so a task that keeps killing its worker ends up failed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn reclaim_stale_tasks(
        &self,
        lease: chrono::Duration,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE work_queue SET
                    status = CASE WHEN attempts + 1 >= ?3 THEN 'failed' ELSE 'pending' END,
                    attempts = attempts + 1,
                    follow_up = 0,
                    last_error = 'lease expired',
                    updated_at = ?2
                 WHERE status = 'processing' AND updated_at < ?1",
                libsql::params![fmt_ts(now - lease), fmt_ts(now), i64::from(max_attempts)],
            )
            .await?;
        if affected > 0 {
            tracing::warn!(reclaimed = affected, "reclaimed stale processing tasks");
        }
        Ok(affected)
    }

    /// Re-open failed tasks, newest per entity and kind, skipping keys that
    /// already have an active task.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn requeue_failed(
        &self,
        kind: Option<TaskKind>,
        now: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE work_queue AS w SET
                    status = 'pending', attempts = 0, follow_up = 0,
                    available_at = ?1, updated_at = ?1
                 WHERE w.status = 'failed'
                   AND (?2 IS NULL OR w.kind = ?2)
                   AND w.id = (
                       SELECT MAX(f.id) FROM work_queue f
                       WHERE f.entity_id = w.entity_id AND f.entity_type = w.entity_type
                         AND f.kind = w.kind AND f.status = 'failed'
                   )
                   AND NOT EXISTS (
                       SELECT 1 FROM work_queue a
                       WHERE a.entity_id = w.entity_id AND a.entity_type = w.entity_type
                         AND a.kind = w.kind AND a.status IN ('pending', 'processing')
                   )",
                libsql::params![fmt_ts(now), kind.map(TaskKind::as_str)],
            )
            .await?;
        Ok(affected)
    }

    /// Delete done tasks last touched before `before`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn purge_done_tasks(&self, before: DateTime<Utc>) -> Result<u64, DatabaseError> {
        Ok(self
            .conn()
            .execute(
                "DELETE FROM work_queue WHERE status = 'done' AND updated_at < ?1",
                [fmt_ts(before)],
            )
            .await?)
    }

    pub async fn get_task(&self, task_id: i64) -> Result<QueueTask, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM work_queue WHERE id = ?1"),
                [task_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_task(&row)
    }

    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<QueueTask>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM work_queue
                     WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR kind = ?2)
                     ORDER BY priority DESC, enqueued_at ASC, entity_id ASC
                     LIMIT ?3"
                ),
                libsql::params![
                    filter.status.map(TaskStatus::as_str),
                    filter.kind.map(TaskKind::as_str),
                    i64::from(filter.limit.unwrap_or(100))
                ],
            )
            .await?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            tasks.push(row_to_task(&row)?);
        }
        Ok(tasks)
    }

    /// Counts per status plus the age of the oldest pending task.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn queue_stats(&self, now: DateTime<Utc>) -> Result<QueueStats, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT status, COUNT(*), MIN(enqueued_at) FROM work_queue GROUP BY status",
                (),
            )
            .await?;

        let mut stats = QueueStats::default();
        while let Some(row) = rows.next().await? {
            let count = to_u64(row.get::<i64>(1)?);
            match parse_enum::<TaskStatus>(&row.get::<String>(0)?)? {
                TaskStatus::Pending => {
                    stats.pending = count;
                    if let Some(oldest) = get_opt_string(&row, 2)? {
                        stats.oldest_pending_age_secs = Some(age_secs(parse_datetime(&oldest)?, now));
                    }
                }
                TaskStatus::Processing => stats.processing = count,
                TaskStatus::Done => stats.done = count,
                TaskStatus::Failed => stats.failed = count,
            }
        }
        Ok(stats)
    }
}

fn not_processing(task_id: i64) -> DatabaseError {
    DatabaseError::InvalidState(format!("task {task_id} is not processing"))
}
