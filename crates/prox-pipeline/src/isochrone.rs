//! Isochrone computation through the configured travel-time provider.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use prox_config::IsochroneProviderConfig;
use prox_core::entities::{EntityRef, IsochroneSet};
use prox_core::errors::PipelineError;
use prox_core::store::EntityStore;
use prox_providers::IsochroneProvider;
use serde::{Deserialize, Serialize};

use crate::cache_policy::{CacheKind, CachePolicy, Lookup, keys};
use crate::error::provider_error;
use crate::nearby::require_coordinates;
use crate::retry::RetryPolicy;

/// Upper bound on a single range; providers reject anything beyond an hour.
const MAX_RANGE_SECS: u32 = 3_600;

/// Profile and ranges of an isochrone request. Also the task payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsochroneRequest {
    pub profile: String,
    pub ranges_secs: Vec<u32>,
}

impl IsochroneRequest {
    /// Sorted, deduplicated, and bounds-checked.
    pub fn new(profile: impl Into<String>, mut ranges_secs: Vec<u32>) -> Result<Self, PipelineError> {
        let profile = profile.into();
        if profile.trim().is_empty() {
            return Err(PipelineError::Input("isochrone profile is empty".into()));
        }
        ranges_secs.sort_unstable();
        ranges_secs.dedup();
        match (ranges_secs.first(), ranges_secs.last()) {
            (None, _) | (_, None) => Err(PipelineError::Input("no isochrone ranges given".into())),
            (Some(0), _) => Err(PipelineError::Input("isochrone ranges must be positive".into())),
            (_, Some(&max)) if max > MAX_RANGE_SECS => Err(PipelineError::Input(format!(
                "isochrone range {max}s exceeds {MAX_RANGE_SECS}s"
            ))),
            _ => Ok(Self {
                profile,
                ranges_secs,
            }),
        }
    }

    /// The request carried by a queued task, or the configured default.
    pub fn from_payload(
        payload: Option<&serde_json::Value>,
        defaults: &IsochroneProviderConfig,
    ) -> Result<Self, PipelineError> {
        match payload {
            Some(value) => {
                let raw: Self = serde_json::from_value(value.clone())
                    .map_err(|e| PipelineError::Input(format!("bad isochrone payload: {e}")))?;
                Self::new(raw.profile, raw.ranges_secs)
            }
            None => Self::new(defaults.profile.clone(), defaults.ranges.clone()),
        }
    }

    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({ "profile": self.profile, "ranges_secs": self.ranges_secs })
    }
}

#[derive(Clone)]
pub struct IsochroneService {
    store: Arc<dyn EntityStore>,
    provider: Option<Arc<dyn IsochroneProvider>>,
    cache: CachePolicy,
    defaults: IsochroneProviderConfig,
    retry: RetryPolicy,
}

impl IsochroneService {
    #[must_use]
    pub fn new(
        store: Arc<dyn EntityStore>,
        provider: Option<Arc<dyn IsochroneProvider>>,
        cache: CachePolicy,
        defaults: IsochroneProviderConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            provider,
            cache,
            defaults,
            retry,
        }
    }

    /// The configured profile and ranges.
    pub fn default_request(&self) -> Result<IsochroneRequest, PipelineError> {
        IsochroneRequest::from_payload(None, &self.defaults)
    }

    pub fn request_from_payload(
        &self,
        payload: Option<&serde_json::Value>,
    ) -> Result<IsochroneRequest, PipelineError> {
        IsochroneRequest::from_payload(payload, &self.defaults)
    }

    pub async fn compute(
        &self,
        origin: EntityRef,
        request: &IsochroneRequest,
    ) -> Result<IsochroneSet, PipelineError> {
        let Some(provider) = &self.provider else {
            return Err(PipelineError::Config(
                "no isochrone provider configured".into(),
            ));
        };
        let entity = self
            .store
            .get_entity(origin.id, origin.entity_type)
            .await?;
        let center = require_coordinates(&entity)?;

        let polygons = self
            .retry
            .run("isochrone", || {
                provider.isochrones(center, &request.profile, &request.ranges_secs)
            })
            .await
            .map_err(|e| provider_error("isochrone", &e))?;

        let set = IsochroneSet {
            origin_id: origin.id,
            profile: request.profile.clone(),
            range_set: request.ranges_secs.clone(),
            polygons,
        };
        let key = keys::isochrone(origin, &request.profile, &request.ranges_secs);
        self.cache
            .put(CacheKind::Isochrone, &key, &set, Utc::now())
            .await?;
        tracing::debug!(
            origin_id = origin.id,
            profile = %request.profile,
            ranges = ?request.ranges_secs,
            "isochrones computed"
        );
        Ok(set)
    }

    /// Whether the entry for `request` is fresh and was written at or after `since`.
    pub async fn fresh_since(
        &self,
        origin: EntityRef,
        request: &IsochroneRequest,
        since: DateTime<Utc>,
    ) -> Result<bool, PipelineError> {
        let key = keys::isochrone(origin, &request.profile, &request.ranges_secs);
        self.cache.fresh_since(&key, since, Utc::now()).await
    }

    pub async fn cached(
        &self,
        origin: EntityRef,
        request: &IsochroneRequest,
    ) -> Result<Lookup<IsochroneSet>, PipelineError> {
        let key = keys::isochrone(origin, &request.profile, &request.ranges_secs);
        self.cache.get(&key, Utc::now()).await
    }
}
