//! Discovery state repository: last outcome per entity.

use chrono::{DateTime, Utc};

use prox_core::entities::{DiscoveryState, EntityRef};
use prox_core::enums::DiscoveryStatus;

use crate::ProxDb;
use crate::error::DatabaseError;
use crate::helpers::{fmt_ts, get_opt_string, parse_datetime, parse_enum, to_u32};

const SELECT_COLS: &str = "entity_id, entity_type, status, reason, failures, updated_at";

fn row_to_state(row: &libsql::Row) -> Result<DiscoveryState, DatabaseError> {
    Ok(DiscoveryState {
        entity_id: row.get(0)?,
        entity_type: parse_enum(&row.get::<String>(1)?)?,
        status: parse_enum(&row.get::<String>(2)?)?,
        reason: get_opt_string(row, 3)?,
        failures: to_u32(row.get::<i64>(4)?),
        updated_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

impl ProxDb {
    /// Record the outcome of a discovery run.
    ///
    /// Failures accumulate; a success resets the counter.
    pub async fn record_discovery(
        &self,
        entity: EntityRef,
        status: DiscoveryStatus,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DiscoveryState, DatabaseError> {
        let failed = i64::from(status == DiscoveryStatus::Failed);
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "INSERT INTO discovery_state
                        (entity_id, entity_type, status, reason, failures, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(entity_type, entity_id) DO UPDATE SET
                        status = excluded.status,
                        reason = excluded.reason,
                        failures = CASE WHEN ?5 = 1 THEN discovery_state.failures + 1 ELSE 0 END,
                        updated_at = excluded.updated_at
                     RETURNING {SELECT_COLS}"
                ),
                libsql::params![
                    entity.id,
                    entity.entity_type.as_str(),
                    status.as_str(),
                    reason,
                    failed,
                    fmt_ts(now)
                ],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_state(&row)
    }

    pub async fn get_discovery_state(
        &self,
        entity: EntityRef,
    ) -> Result<Option<DiscoveryState>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM discovery_state
                     WHERE entity_id = ?1 AND entity_type = ?2"
                ),
                libsql::params![entity.id, entity.entity_type.as_str()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_state(&row)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use prox_core::enums::EntityType;

    #[tokio::test]
    async fn failures_accumulate_and_reset() {
        let db = ProxDb::open_local(":memory:").await.unwrap();
        let now = Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap();
        let entity = EntityRef::new(4, EntityType::Charger);

        db.record_discovery(entity, DiscoveryStatus::Failed, Some("mapy: timeout"), now)
            .await
            .unwrap();
        let state = db
            .record_discovery(entity, DiscoveryStatus::Failed, Some("mapy: 503"), now)
            .await
            .unwrap();
        assert_eq!(state.failures, 2);
        assert_eq!(state.reason.as_deref(), Some("mapy: 503"));

        let state = db
            .record_discovery(entity, DiscoveryStatus::Succeeded, None, now)
            .await
            .unwrap();
        assert_eq!(state.failures, 0);
        assert_eq!(
            db.get_discovery_state(entity).await.unwrap().unwrap().status,
            DiscoveryStatus::Succeeded
        );
    }
}
