//! Exponential backoff schedule.
//!
//! Used by the work queue to push `available_at` into the future after a
//! retryable failure, and by the pipeline to pace provider retries.

use std::time::Duration;

/// Attempt limit and capped exponential delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial one).
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Maximum delay between attempts (backoff is capped here).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryConfig {
    /// Delay to wait after `failed_attempts` failures (1-based): base, 2×base, 4×base, …
    #[must_use]
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1_u32 << exponent)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Whether another attempt is allowed after `failed_attempts` failures.
    #[must_use]
    pub const fn allows_retry(&self, failed_attempts: u32) -> bool {
        failed_attempts < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn delays_double_until_capped() {
        let config = RetryConfig {
            max_attempts: 10,
            base_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(300),
        };
        assert_eq!(config.delay_for(1), Duration::from_secs(30));
        assert_eq!(config.delay_for(2), Duration::from_secs(60));
        assert_eq!(config.delay_for(4), Duration::from_secs(240));
        assert_eq!(config.delay_for(5), Duration::from_secs(300));
        assert_eq!(config.delay_for(40), Duration::from_secs(300));
    }

    #[test]
    fn retry_allowed_below_max() {
        let config = RetryConfig {
            max_attempts: 3,
            ..Default::default()
        };
        assert!(config.allows_retry(2));
        assert!(!config.allows_retry(3));
    }
}
