//! Per-origin computation locks with their own expiry.

use chrono::{DateTime, Utc};

use crate::ProxDb;
use crate::error::DatabaseError;
use crate::helpers::fmt_ts;

impl ProxDb {
    /// Take `key` for `owner` if it is free or its holder's lock has expired.
    ///
    /// One upsert statement: concurrent callers cannot both win.
    pub async fn try_acquire_lock(
        &self,
        key: &str,
        owner: &str,
        ttl: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "INSERT INTO compute_locks (key, owner, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                    owner = excluded.owner,
                    expires_at = excluded.expires_at
                 WHERE compute_locks.expires_at <= ?4
                 RETURNING owner",
                libsql::params![key, owner, fmt_ts(now + ttl), fmt_ts(now)],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }

    /// Release `key` if `owner` still holds it.
    pub async fn release_lock(&self, key: &str, owner: &str) -> Result<bool, DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "DELETE FROM compute_locks WHERE key = ?1 AND owner = ?2",
                libsql::params![key, owner],
            )
            .await?;
        Ok(affected > 0)
    }

    /// Current unexpired holder of `key`.
    pub async fn lock_holder(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT owner FROM compute_locks WHERE key = ?1 AND expires_at > ?2",
                libsql::params![key, fmt_ts(now)],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }
}
