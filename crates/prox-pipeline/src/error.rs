//! Mapping of crate-local errors into [`PipelineError`].

use prox_core::enums::ProviderId;
use prox_core::errors::PipelineError;
use prox_providers::ProviderError;

/// Classify a provider failure for the queue.
///
/// A provider that is not configured is a configuration problem; anything
/// else the provider says is treated as transient so the task is retried
/// with backoff until its attempts run out.
pub(crate) fn provider_error(provider: &str, err: &ProviderError) -> PipelineError {
    match err {
        ProviderError::NotConfigured(what) => PipelineError::Config(what.clone()),
        other => PipelineError::TransientProvider {
            provider: provider.to_string(),
            message: other.to_string(),
        },
    }
}

pub(crate) fn place_provider_error(provider: ProviderId, err: &ProviderError) -> PipelineError {
    provider_error(provider.as_str(), err)
}
