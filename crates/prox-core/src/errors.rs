//! Cross-cutting error types.
//!
//! Crate-local errors (`DatabaseError`, `ProviderError`, `ConfigError`) live in
//! their crates. [`PipelineError`] is the taxonomy the processors speak: it
//! decides whether a failed task is retried, failed for good, or deferred.

use thiserror::Error;

/// Errors that can be raised by any Proxima crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// A state machine transition was attempted that is not allowed.
    #[error("Invalid state transition: {entity_type} {id} from {from} to {to}")]
    InvalidTransition {
        entity_type: String,
        id: String,
        from: String,
        to: String,
    },

    /// Data failed validation (format, range, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure taxonomy for queue-driven and on-demand work.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or invalid input (no coordinates, unknown entity). Not retried.
    #[error("input error: {0}")]
    Input(String),

    /// Provider timeout, 5xx, or rate limit. Retried with backoff.
    #[error("provider error ({provider}): {message}")]
    TransientProvider { provider: String, message: String },

    /// The on-demand time budget was exhausted. Deferred, not failed.
    #[error("time budget of {budget_ms}ms exceeded")]
    Capacity { budget_ms: u64 },

    /// Persistence failure in the pipeline's own tables or the entity store.
    #[error("database error: {0}")]
    Database(String),

    /// Invalid or missing configuration (no provider configured, empty secret).
    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Whether the work queue should retry a task that failed with this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Input(_) | Self::Config(_))
    }

    /// Stable short label used by the batch circuit breaker and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::TransientProvider { .. } => "transient_provider",
            Self::Capacity { .. } => "capacity",
            Self::Database(_) => "database",
            Self::Config(_) => "config",
        }
    }
}

impl From<CoreError> for PipelineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { .. } | CoreError::Validation(_) => Self::Input(err.to_string()),
            CoreError::InvalidTransition { .. } | CoreError::Other(_) => {
                Self::Database(err.to_string())
            }
        }
    }
}
