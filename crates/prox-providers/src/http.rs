//! Shared HTTP helpers for provider clients.
//!
//! Status-code checks (429 with `Retry-After`, non-success → [`ProviderError::Api`])
//! and JSON body decoding live here so each provider module only builds
//! requests and maps responses.

use serde::de::DeserializeOwned;

use crate::error::ProviderError;

/// Check an HTTP response for common error conditions.
///
/// Returns the response unchanged on success. Handles:
/// - **429 Too Many Requests** → [`ProviderError::RateLimited`], honouring
///   `Retry-After` seconds (60 s when absent or unparseable).
/// - **Non-success status** → [`ProviderError::Api`] with the status code and
///   a truncated response body.
pub async fn check_response(
    resp: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    if resp.status() == 429 {
        let retry_after = parse_retry_after(&resp);
        return Err(ProviderError::RateLimited {
            retry_after_secs: retry_after,
        });
    }
    if !resp.status().is_success() {
        return Err(ProviderError::Api {
            status: resp.status().as_u16(),
            message: truncate(resp.text().await.unwrap_or_default()),
        });
    }
    Ok(resp)
}

/// Decode a successful response body, reporting schema mismatches as parse errors.
pub async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ProviderError> {
    let body = check_response(resp).await?.text().await?;
    serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))
}

fn truncate(mut body: String) -> String {
    const MAX: usize = 300;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        body.truncate(cut);
        body.push('…');
    }
    body
}

/// Parse the `Retry-After` header as seconds, falling back to 60 s.
fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60)
}
