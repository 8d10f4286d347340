//! On-demand processing configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_time_budget_ms() -> u64 {
    3_000
}

const fn default_lock_ttl_secs() -> u64 {
    60
}

const fn default_token_validity_secs() -> u64 {
    300
}

const fn default_retry_after_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OnDemandConfig {
    /// How long a caller waits for an inline computation.
    #[serde(default = "default_time_budget_ms")]
    pub time_budget_ms: u64,

    /// Expiry of the per-origin computation lock.
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,

    /// HMAC secret for process tokens. Empty disables the process endpoint.
    #[serde(default)]
    pub token_secret: String,

    #[serde(default = "default_token_validity_secs")]
    pub token_validity_secs: u64,

    /// Polling hint returned with deferred responses.
    #[serde(default = "default_retry_after_secs")]
    pub retry_after_secs: u64,
}

impl Default for OnDemandConfig {
    fn default() -> Self {
        Self {
            time_budget_ms: default_time_budget_ms(),
            lock_ttl_secs: default_lock_ttl_secs(),
            token_secret: String::new(),
            token_validity_secs: default_token_validity_secs(),
            retry_after_secs: default_retry_after_secs(),
        }
    }
}

impl OnDemandConfig {
    pub fn tokens_enabled(&self) -> bool {
        !self.token_secret.is_empty()
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.time_budget_ms == 0 {
            return Err(ConfigError::invalid("on_demand.time_budget_ms", "must be positive"));
        }
        if self.lock_ttl_secs.saturating_mul(1_000) < self.time_budget_ms {
            return Err(ConfigError::invalid(
                "on_demand.lock_ttl_secs",
                "lock must outlive the time budget",
            ));
        }
        Ok(())
    }
}
