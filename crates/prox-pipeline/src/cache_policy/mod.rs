//! Cache policy: TTL per kind of entry, typed reads, and maintenance.
//!
//! Entries are never served as fresh past `expires_at`. Invalidation after
//! mutations is push-based (the work queue expires affected nearby entries);
//! pattern invalidation and purging are administrative.

pub mod keys;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use prox_config::CacheConfig;
use prox_core::errors::PipelineError;
use prox_db::ProxDb;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// What a cache entry holds, which decides its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Nearby,
    Isochrone,
    Geocode,
}

/// Result of a typed cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Fresh(T),
    /// Past `expires_at`; may only be shown explicitly marked stale.
    Stale(T),
    Missing,
}

impl<T> Lookup<T> {
    #[must_use]
    pub fn fresh(self) -> Option<T> {
        match self {
            Self::Fresh(value) => Some(value),
            Self::Stale(_) | Self::Missing => None,
        }
    }

    /// Any stored value, fresh or not.
    #[must_use]
    pub fn any(self) -> Option<T> {
        match self {
            Self::Fresh(value) | Self::Stale(value) => Some(value),
            Self::Missing => None,
        }
    }
}

#[derive(Clone)]
pub struct CachePolicy {
    db: Arc<ProxDb>,
    config: CacheConfig,
}

impl CachePolicy {
    #[must_use]
    pub const fn new(db: Arc<ProxDb>, config: CacheConfig) -> Self {
        Self { db, config }
    }

    #[must_use]
    pub fn ttl(&self, kind: CacheKind) -> Duration {
        let secs = match kind {
            CacheKind::Nearby => self.config.nearby_ttl_secs,
            CacheKind::Isochrone => self.config.isochrone_ttl_secs,
            CacheKind::Geocode => self.config.geocode_ttl_secs,
        };
        crate::seconds(secs)
    }

    /// Read and decode `key`.
    ///
    /// An entry that no longer decodes (written by an older layout) reads as
    /// missing so it gets recomputed.
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Lookup<T>, PipelineError> {
        let Some(entry) = self.db.cache_get(key).await? else {
            return Ok(Lookup::Missing);
        };
        let fresh = entry.is_fresh_at(now);
        match serde_json::from_value(entry.value) {
            Ok(value) if fresh => Ok(Lookup::Fresh(value)),
            Ok(value) => Ok(Lookup::Stale(value)),
            Err(error) => {
                tracing::warn!(key, %error, "undecodable cache entry ignored");
                Ok(Lookup::Missing)
            }
        }
    }

    pub async fn put<T: Serialize>(
        &self,
        kind: CacheKind,
        key: &str,
        value: &T,
        now: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        let value = serde_json::to_value(value)
            .map_err(|e| PipelineError::Database(format!("encode cache value: {e}")))?;
        self.db
            .cache_set(key, &value, now + self.ttl(kind), now)
            .await?;
        Ok(())
    }

    /// Whether `key` holds an entry that is fresh at `now` and was written at
    /// or after `since`.
    pub async fn fresh_since(
        &self,
        key: &str,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, PipelineError> {
        Ok(self
            .db
            .cache_get(key)
            .await?
            .is_some_and(|entry| entry.is_fresh_at(now) && entry.updated_at >= since))
    }

    /// Expire (without deleting) every entry matching `pattern`.
    pub async fn expire(&self, pattern: &str, now: DateTime<Utc>) -> Result<u64, PipelineError> {
        Ok(self.db.cache_expire_matching(pattern, now).await?)
    }

    /// Delete every entry matching `pattern`.
    pub async fn invalidate(&self, pattern: &str) -> Result<u64, PipelineError> {
        Ok(self.db.cache_invalidate(pattern).await?)
    }

    /// Delete entries that expired more than the purge grace period ago.
    ///
    /// The grace period keeps recently expired entries around as stale
    /// fallbacks for deferred on-demand answers.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, PipelineError> {
        let grace = crate::seconds(self.config.purge_grace_secs);
        let purged = self.db.cache_purge_expired(now - grace).await?;
        if purged > 0 {
            tracing::info!(purged, "expired cache entries purged");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn policy() -> CachePolicy {
        let db = Arc::new(ProxDb::open_local(":memory:").await.unwrap());
        CachePolicy::new(db, CacheConfig::default())
    }

    #[test]
    fn ttls_differ_by_kind() {
        let config = CacheConfig::default();
        assert!(config.nearby_ttl_secs < config.isochrone_ttl_secs);
        assert!(config.isochrone_ttl_secs < config.geocode_ttl_secs);
    }

    #[tokio::test]
    async fn entry_goes_stale_after_ttl() {
        let policy = policy().await;
        let now = Utc::now();
        policy
            .put(CacheKind::Nearby, "nearby:poi:1:poi:default", &vec![1, 2], now)
            .await
            .unwrap();

        let fresh: Lookup<Vec<i32>> = policy.get("nearby:poi:1:poi:default", now).await.unwrap();
        assert_eq!(fresh, Lookup::Fresh(vec![1, 2]));

        let later = now + policy.ttl(CacheKind::Nearby);
        let stale: Lookup<Vec<i32>> = policy
            .get("nearby:poi:1:poi:default", later)
            .await
            .unwrap();
        assert_eq!(stale, Lookup::Stale(vec![1, 2]));
    }

    #[tokio::test]
    async fn expire_keeps_value_as_stale() {
        let policy = policy().await;
        let now = Utc::now();
        policy
            .put(CacheKind::Nearby, "nearby:poi:1:charger:default", &5, now)
            .await
            .unwrap();
        assert_eq!(policy.expire("nearby:poi:1:*", now).await.unwrap(), 1);

        let after: Lookup<i32> = policy
            .get("nearby:poi:1:charger:default", now)
            .await
            .unwrap();
        assert_eq!(after, Lookup::Stale(5));
    }

    #[tokio::test]
    async fn purge_respects_grace_period() {
        let policy = policy().await;
        let now = Utc::now();
        policy
            .put(CacheKind::Nearby, "nearby:poi:2:poi:default", &1, now)
            .await
            .unwrap();
        let just_expired = now + policy.ttl(CacheKind::Nearby) + Duration::seconds(1);
        assert_eq!(policy.purge_expired(just_expired).await.unwrap(), 0);

        let long_after = just_expired + Duration::days(2);
        assert_eq!(policy.purge_expired(long_after).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn fresh_since_needs_a_newer_unexpired_write() {
        let policy = policy().await;
        let written = Utc::now();
        let key = "isochrone:charger:1:foot-walking:300";
        policy.put(CacheKind::Isochrone, key, &1, written).await.unwrap();

        assert!(policy.fresh_since(key, written, written).await.unwrap());
        assert!(policy.fresh_since(key, written - Duration::seconds(1), written).await.unwrap());
        assert!(!policy.fresh_since(key, written + Duration::seconds(1), written).await.unwrap());

        policy.expire(key, written).await.unwrap();
        assert!(!policy.fresh_since(key, written, written).await.unwrap());
        assert!(!policy.fresh_since("isochrone:missing", written, written).await.unwrap());
    }

    #[tokio::test]
    async fn undecodable_entry_reads_as_missing() {
        let policy = policy().await;
        let now = Utc::now();
        policy
            .put(CacheKind::Geocode, "geocode:mapy:x", &"text", now)
            .await
            .unwrap();
        let read: Lookup<Vec<u32>> = policy.get("geocode:mapy:x", now).await.unwrap();
        assert_eq!(read, Lookup::Missing);
    }
}
