//! Work queue and batch sweep configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_max_attempts() -> u32 {
    5
}

const fn default_backoff_base_secs() -> u64 {
    30
}

const fn default_backoff_max_secs() -> u64 {
    3_600
}

const fn default_batch_size() -> usize {
    50
}

const fn default_lease_secs() -> u64 {
    600
}

const fn default_sweep_interval_secs() -> u64 {
    300
}

const fn default_breaker_threshold() -> usize {
    3
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Attempts before a task is marked failed (including the first).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles per attempt.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,

    /// Upper bound on the retry delay.
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,

    /// Tasks claimed per batch run.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Processing tasks older than this are assumed orphaned and reclaimed.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,

    /// Cadence of the scheduled sweep.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Consecutive identical errors that stop a batch early.
    #[serde(default = "default_breaker_threshold")]
    pub breaker_threshold: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_max_secs: default_backoff_max_secs(),
            batch_size: default_batch_size(),
            lease_secs: default_lease_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            breaker_threshold: default_breaker_threshold(),
        }
    }
}

impl QueueConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("queue.max_attempts", "must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::invalid("queue.batch_size", "must be at least 1"));
        }
        if self.breaker_threshold < 2 {
            return Err(ConfigError::invalid(
                "queue.breaker_threshold",
                "must be at least 2 to detect a recurring error",
            ));
        }
        if self.backoff_max_secs < self.backoff_base_secs {
            return Err(ConfigError::invalid(
                "queue.backoff_max_secs",
                "must not be smaller than backoff_base_secs",
            ));
        }
        Ok(())
    }
}
