//! Cache store repository: key → (JSON value, expiry).
//!
//! Expired rows stay until purged so callers can serve them explicitly as
//! stale. Pattern operations use SQLite `GLOB` over the composite keys.

use chrono::{DateTime, Utc};

use prox_core::entities::CacheEntry;

use crate::ProxDb;
use crate::error::DatabaseError;
use crate::helpers::{fmt_ts, parse_datetime, parse_json, to_json};

const SELECT_COLS: &str = "key, value, expires_at, updated_at";

fn row_to_entry(row: &libsql::Row) -> Result<CacheEntry, DatabaseError> {
    Ok(CacheEntry {
        key: row.get(0)?,
        value: parse_json(&row.get::<String>(1)?)?,
        expires_at: parse_datetime(&row.get::<String>(2)?)?,
        updated_at: parse_datetime(&row.get::<String>(3)?)?,
    })
}

impl ProxDb {
    /// Fetch an entry regardless of freshness.
    pub async fn cache_get(&self, key: &str) -> Result<Option<CacheEntry>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM cache_entries WHERE key = ?1"),
                [key],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_entry(&row)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace an entry.
    pub async fn cache_set(
        &self,
        key: &str,
        value: &serde_json::Value,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO cache_entries (key, value, expires_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    expires_at = excluded.expires_at,
                    updated_at = excluded.updated_at",
                libsql::params![key, to_json(value)?, fmt_ts(expires_at), fmt_ts(now)],
            )
            .await?;
        Ok(())
    }

    /// Delete one entry. Returns whether it existed.
    pub async fn cache_delete(&self, key: &str) -> Result<bool, DatabaseError> {
        let affected = self
            .conn()
            .execute("DELETE FROM cache_entries WHERE key = ?1", [key])
            .await?;
        Ok(affected > 0)
    }

    /// Mark every fresh entry matching `pattern` as expired at `now` without deleting it.
    pub async fn cache_expire_matching(
        &self,
        pattern: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        Ok(self
            .conn()
            .execute(
                "UPDATE cache_entries SET expires_at = ?2
                 WHERE key GLOB ?1 AND expires_at > ?2",
                libsql::params![pattern, fmt_ts(now)],
            )
            .await?)
    }

    /// Delete every entry matching `pattern`.
    pub async fn cache_invalidate(&self, pattern: &str) -> Result<u64, DatabaseError> {
        let affected = self
            .conn()
            .execute("DELETE FROM cache_entries WHERE key GLOB ?1", [pattern])
            .await?;
        tracing::debug!(pattern, deleted = affected, "cache invalidated");
        Ok(affected)
    }

    /// Delete entries that expired before `before`.
    pub async fn cache_purge_expired(&self, before: DateTime<Utc>) -> Result<u64, DatabaseError> {
        Ok(self
            .conn()
            .execute(
                "DELETE FROM cache_entries WHERE expires_at < ?1",
                [fmt_ts(before)],
            )
            .await?)
    }

    /// Keys matching `pattern`, sorted.
    pub async fn cache_keys(&self, pattern: &str) -> Result<Vec<String>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT key FROM cache_entries WHERE key GLOB ?1 ORDER BY key",
                [pattern],
            )
            .await?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next().await? {
            keys.push(row.get::<String>(0)?);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn test_db() -> ProxDb {
        ProxDb::open_local(":memory:").await.unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn set_get_overwrite() {
        let db = test_db().await;
        let ttl = chrono::Duration::minutes(15);
        db.cache_set("nearby:poi:1:charger:default", &json!([1]), t0() + ttl, t0())
            .await
            .unwrap();
        db.cache_set("nearby:poi:1:charger:default", &json!([2]), t0() + ttl, t0())
            .await
            .unwrap();

        let entry = db
            .cache_get("nearby:poi:1:charger:default")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.value, json!([2]));
        assert!(entry.is_fresh_at(t0()));
        assert!(!entry.is_fresh_at(t0() + ttl));
    }

    #[tokio::test]
    async fn expire_matching_keeps_rows_but_stales_them() {
        let db = test_db().await;
        let later = t0() + chrono::Duration::hours(1);
        for key in [
            "nearby:poi:1:charger:default",
            "nearby:poi:1:poi:default",
            "nearby:poi:12:charger:default",
        ] {
            db.cache_set(key, &json!([]), later, t0()).await.unwrap();
        }

        let expired = db.cache_expire_matching("nearby:poi:1:*", t0()).await.unwrap();
        assert_eq!(expired, 2);

        let stale = db.cache_get("nearby:poi:1:poi:default").await.unwrap().unwrap();
        assert!(!stale.is_fresh_at(t0()));
        let untouched = db
            .cache_get("nearby:poi:12:charger:default")
            .await
            .unwrap()
            .unwrap();
        assert!(untouched.is_fresh_at(t0()));
    }

    #[tokio::test]
    async fn invalidate_and_purge() {
        let db = test_db().await;
        db.cache_set("isochrone:1:foot-walking:300", &json!({}), t0(), t0())
            .await
            .unwrap();
        db.cache_set("geocode:mapy:praha", &json!({}), t0() + chrono::Duration::days(7), t0())
            .await
            .unwrap();

        let purged = db
            .cache_purge_expired(t0() + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(purged, 1);

        assert_eq!(db.cache_invalidate("geocode:*").await.unwrap(), 1);
        assert!(db.cache_keys("*").await.unwrap().is_empty());
        assert!(!db.cache_delete("geocode:mapy:praha").await.unwrap());
    }
}
