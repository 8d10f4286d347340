//! Per-origin compute locks shared by the batch and on-demand paths.
//!
//! Every acquisition gets its own owner id, so a holder whose lock expired
//! and was taken over can never release the newer holder's lock.

use std::sync::Arc;

use chrono::Utc;
use prox_core::errors::PipelineError;
use prox_db::ProxDb;

#[derive(Clone)]
pub struct ComputeLocks {
    db: Arc<ProxDb>,
    ttl: chrono::Duration,
}

/// A held lock. Release it explicitly; an unreleased lock lapses after its TTL.
#[derive(Debug)]
pub struct LockGuard {
    db: Arc<ProxDb>,
    key: String,
    owner: String,
}

impl ComputeLocks {
    #[must_use]
    pub const fn new(db: Arc<ProxDb>, ttl: chrono::Duration) -> Self {
        Self { db, ttl }
    }

    /// Take `key` under a fresh owner id. `None` when someone else holds it.
    pub async fn acquire(&self, key: &str) -> Result<Option<LockGuard>, PipelineError> {
        let owner = new_owner();
        let acquired = self
            .db
            .try_acquire_lock(key, &owner, self.ttl, Utc::now())
            .await?;
        Ok(acquired.then(|| LockGuard {
            db: Arc::clone(&self.db),
            key: key.to_string(),
            owner,
        }))
    }
}

impl LockGuard {
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Release the lock if this guard still owns it. Failures are logged.
    pub async fn release(self) {
        match self.db.release_lock(&self.key, &self.owner).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(lock = %self.key, "compute lock lapsed before release");
            }
            Err(error) => {
                tracing::warn!(lock = %self.key, %error, "failed to release compute lock");
            }
        }
    }
}

/// Random owner id for one acquisition.
fn new_owner() -> String {
    let mut bytes = [0u8; 8];
    match getrandom::fill(&mut bytes) {
        Ok(()) => hex::encode(bytes),
        Err(_) => format!("pid-{}-{}", std::process::id(), Utc::now().timestamp_micros()),
    }
}
