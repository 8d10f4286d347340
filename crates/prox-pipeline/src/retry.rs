//! Provider call retries.

use std::future::Future;
use std::time::Duration;

use prox_db::retry::RetryConfig;
use prox_providers::ProviderError;

/// Upper bound on a server-supplied `Retry-After` we are willing to sleep inline.
const MAX_INLINE_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Retries a provider call while its error is retryable.
///
/// Delays follow the shared exponential schedule. A rate-limit hint from the
/// provider replaces the computed delay when it is short enough to wait out;
/// longer hints end the retries so the work queue's backoff takes over.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    schedule: RetryConfig,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(schedule: RetryConfig) -> Self {
        Self { schedule }
    }

    /// Build from the discovery settings (`provider_attempts`, `provider_backoff_ms`).
    #[must_use]
    pub fn from_discovery(config: &prox_config::DiscoveryConfig) -> Self {
        let base = Duration::from_millis(config.provider_backoff_ms);
        Self::new(RetryConfig {
            max_attempts: config.provider_attempts.max(1),
            base_delay: base,
            max_delay: base.saturating_mul(8),
        })
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(RetryConfig {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        })
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.schedule.max_attempts
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut failed = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    failed += 1;
                    if !err.is_retryable() || !self.schedule.allows_retry(failed) {
                        return Err(err);
                    }
                    let delay = match err.retry_after_secs().map(Duration::from_secs) {
                        Some(hint) if hint > MAX_INLINE_RETRY_AFTER => return Err(err),
                        Some(hint) => hint,
                        None => self.schedule.delay_for(failed),
                    };
                    tracing::debug!(
                        label,
                        attempt = failed,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "retrying provider call"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
