//! Provider error types.

use thiserror::Error;

/// Errors that can occur when calling an external geodata provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP transport error (connect failure, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned a non-success status code or an error status in the body.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code, or the closest equivalent for in-body errors.
        status: u16,
        /// Error message or response body.
        message: String,
    },

    /// Failed to parse a provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// The provider returned a 429 Too Many Requests response.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// The provider has no credentials or endpoint configured.
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Whether repeating the same request later could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => !e.is_builder() && !e.is_decode(),
            Self::Api { status, .. } => *status >= 500 || *status == 408,
            Self::RateLimited { .. } => true,
            Self::Parse(_) | Self::NotConfigured(_) => false,
        }
    }

    /// Server-requested wait before the next attempt, if any.
    #[must_use]
    pub const fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }
}
