//! openrouteservice isochrone client.

use async_trait::async_trait;
use prox_config::IsochroneProviderConfig;
use prox_core::geo::Coordinates;
use serde_json::json;

use crate::http::read_json;
use crate::{IsochroneProvider, ProviderError};

/// Client for `POST /v2/isochrones/{profile}`.
#[derive(Clone)]
pub struct OrsClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OrsClient {
    #[must_use]
    pub fn new(http: reqwest::Client, config: &IsochroneProviderConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Reject bodies that are not a feature collection with one feature per range.
fn validate_feature_collection(
    body: serde_json::Value,
    ranges: usize,
) -> Result<serde_json::Value, ProviderError> {
    if body.get("type").and_then(serde_json::Value::as_str) != Some("FeatureCollection") {
        return Err(ProviderError::Parse(
            "isochrone response is not a FeatureCollection".into(),
        ));
    }
    let features = body
        .get("features")
        .and_then(serde_json::Value::as_array)
        .map_or(0, Vec::len);
    if features != ranges {
        return Err(ProviderError::Parse(format!(
            "expected {ranges} isochrone features, got {features}"
        )));
    }
    Ok(body)
}

#[async_trait]
impl IsochroneProvider for OrsClient {
    async fn isochrones(
        &self,
        center: Coordinates,
        profile: &str,
        ranges_secs: &[u32],
    ) -> Result<serde_json::Value, ProviderError> {
        if ranges_secs.is_empty() {
            return Err(ProviderError::Parse("no isochrone ranges requested".into()));
        }
        let url = format!(
            "{}/v2/isochrones/{}",
            self.base_url,
            urlencoding::encode(profile)
        );
        let body = json!({
            "locations": [[center.lng(), center.lat()]],
            "range": ranges_secs,
            "range_type": "time",
        });
        let resp = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.api_key.as_str())
            .header(reqwest::header::ACCEPT, "application/geo+json")
            .json(&body)
            .send()
            .await?;
        validate_feature_collection(read_json(resp).await?, ranges_secs.len())
    }
}
