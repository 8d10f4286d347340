//! Review queue repository.
//!
//! Items are only ever created pending and moved by an operator; the
//! pipeline never transitions them.

use chrono::{DateTime, Utc};

use prox_core::entities::{DiscoveryCandidate, EntityRef, ReviewQueueItem, ReviewStats};
use prox_core::enums::ReviewStatus;

use crate::ProxDb;
use crate::error::DatabaseError;
use crate::helpers::{
    age_secs, fmt_ts, get_opt_string, parse_datetime, parse_enum, parse_json,
    parse_optional_datetime, to_json, to_u64,
};

const SELECT_COLS: &str =
    "id, entity_id, entity_type, candidate, distance_m, status, created_at, resolved_at";

fn row_to_item(row: &libsql::Row) -> Result<ReviewQueueItem, DatabaseError> {
    Ok(ReviewQueueItem {
        id: row.get(0)?,
        entity_id: row.get(1)?,
        entity_type: parse_enum(&row.get::<String>(2)?)?,
        candidate: parse_json(&row.get::<String>(3)?)?,
        distance_m: row.get(4)?,
        status: parse_enum(&row.get::<String>(5)?)?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
        resolved_at: parse_optional_datetime(get_opt_string(row, 7)?.as_deref())?,
    })
}

/// Filter for [`ProxDb::list_review_items`].
#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub status: Option<ReviewStatus>,
    pub entity: Option<EntityRef>,
    pub limit: Option<u32>,
}

impl ProxDb {
    /// Queue a candidate for review.
    ///
    /// Returns `None` when the same candidate is already pending for the entity.
    pub async fn insert_review_item(
        &self,
        entity: EntityRef,
        candidate: &DiscoveryCandidate,
        now: DateTime<Utc>,
    ) -> Result<Option<ReviewQueueItem>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "INSERT INTO review_queue
                        (entity_id, entity_type, provider, external_id, candidate,
                         distance_m, status, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)
                     ON CONFLICT DO NOTHING
                     RETURNING {SELECT_COLS}"
                ),
                libsql::params![
                    entity.id,
                    entity.entity_type.as_str(),
                    candidate.source_provider.as_str(),
                    candidate.external_id.as_str(),
                    to_json(candidate)?,
                    candidate.distance_m,
                    fmt_ts(now)
                ],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_item(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_review_item(&self, id: i64) -> Result<ReviewQueueItem, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM review_queue WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_item(&row)
    }

    /// Oldest first.
    pub async fn list_review_items(
        &self,
        filter: &ReviewFilter,
    ) -> Result<Vec<ReviewQueueItem>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM review_queue
                     WHERE (?1 IS NULL OR status = ?1)
                       AND (?2 IS NULL OR (entity_id = ?2 AND entity_type = ?3))
                     ORDER BY created_at ASC, id ASC
                     LIMIT ?4"
                ),
                libsql::params![
                    filter.status.map(ReviewStatus::as_str),
                    filter.entity.map(|e| e.id),
                    filter.entity.map(|e| e.entity_type.as_str()),
                    i64::from(filter.limit.unwrap_or(100))
                ],
            )
            .await?;
        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(row_to_item(&row)?);
        }
        Ok(items)
    }

    /// Move a pending item to approved or rejected.
    ///
    /// # Errors
    ///
    /// Returns `NoResult` for an unknown id and `InvalidState` when the item
    /// is not pending or `decision` is not a terminal status.
    pub async fn resolve_review_item(
        &self,
        id: i64,
        decision: ReviewStatus,
        now: DateTime<Utc>,
    ) -> Result<ReviewQueueItem, DatabaseError> {
        if !ReviewStatus::Pending.can_transition_to(decision) {
            return Err(DatabaseError::InvalidState(format!(
                "review items cannot be resolved as {decision}"
            )));
        }
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "UPDATE review_queue SET status = ?2, resolved_at = ?3
                     WHERE id = ?1 AND status = 'pending'
                     RETURNING {SELECT_COLS}"
                ),
                libsql::params![id, decision.as_str(), fmt_ts(now)],
            )
            .await?;
        if let Some(row) = rows.next().await? {
            return row_to_item(&row);
        }

        let current = self.get_review_item(id).await?;
        Err(DatabaseError::InvalidState(format!(
            "review item {id} is already {}",
            current.status
        )))
    }

    /// Counts per status plus the age of the oldest pending item.
    pub async fn review_stats(&self, now: DateTime<Utc>) -> Result<ReviewStats, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT status, COUNT(*), MIN(created_at) FROM review_queue GROUP BY status",
                (),
            )
            .await?;
        let mut stats = ReviewStats::default();
        while let Some(row) = rows.next().await? {
            let count = to_u64(row.get::<i64>(1)?);
            match parse_enum::<ReviewStatus>(&row.get::<String>(0)?)? {
                ReviewStatus::Pending => {
                    stats.pending = count;
                    if let Some(oldest) = get_opt_string(&row, 2)? {
                        stats.oldest_pending_age_secs =
                            Some(age_secs(parse_datetime(&oldest)?, now));
                    }
                }
                ReviewStatus::Approved => stats.approved = count,
                ReviewStatus::Rejected => stats.rejected = count,
            }
        }
        Ok(stats)
    }
}
