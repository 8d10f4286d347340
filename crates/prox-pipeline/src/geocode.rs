//! Geocoding pass-through with long-lived caching.

use std::sync::Arc;

use chrono::Utc;
use prox_core::enums::ProviderId;
use prox_core::errors::PipelineError;
use prox_core::geo::Coordinates;
use prox_providers::{GeocodeResult, PlaceProvider, Providers};

use crate::cache_policy::{CacheKind, CachePolicy, Lookup, keys};
use crate::error::place_provider_error;
use crate::retry::RetryPolicy;

/// Results fetched per query; callers' limits are applied to the cached list.
const FETCH_LIMIT: usize = 10;

#[derive(Clone)]
pub struct CachedGeocoder {
    providers: Providers,
    cache: CachePolicy,
    retry: RetryPolicy,
}

impl CachedGeocoder {
    #[must_use]
    pub const fn new(providers: Providers, cache: CachePolicy, retry: RetryPolicy) -> Self {
        Self {
            providers,
            cache,
            retry,
        }
    }

    fn pick(&self, provider: Option<ProviderId>) -> Result<Arc<dyn PlaceProvider>, PipelineError> {
        let found = match provider {
            Some(id) => self.providers.get(id),
            None => self.providers.all().into_iter().next(),
        };
        found.ok_or_else(|| {
            PipelineError::Config(provider.map_or_else(
                || "no place provider configured".to_string(),
                |id| format!("provider {id} is not configured"),
            ))
        })
    }

    pub async fn geocode(
        &self,
        provider: Option<ProviderId>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<GeocodeResult>, PipelineError> {
        if query.trim().is_empty() {
            return Err(PipelineError::Input("empty geocode query".into()));
        }
        let provider = self.pick(provider)?;
        let key = keys::geocode(provider.id(), query);
        let now = Utc::now();

        let mut results = match self.cache.get::<Vec<GeocodeResult>>(&key, now).await? {
            Lookup::Fresh(results) => results,
            Lookup::Stale(_) | Lookup::Missing => {
                let results = self
                    .retry
                    .run(provider.id().as_str(), || provider.geocode(query, FETCH_LIMIT))
                    .await
                    .map_err(|e| place_provider_error(provider.id(), &e))?;
                self.cache
                    .put(CacheKind::Geocode, &key, &results, now)
                    .await?;
                results
            }
        };
        results.truncate(limit);
        Ok(results)
    }

    pub async fn reverse(
        &self,
        provider: Option<ProviderId>,
        at: Coordinates,
    ) -> Result<Option<GeocodeResult>, PipelineError> {
        let provider = self.pick(provider)?;
        let key = keys::reverse(provider.id(), at);
        let now = Utc::now();

        if let Lookup::Fresh(hit) = self.cache.get::<Option<GeocodeResult>>(&key, now).await? {
            return Ok(hit);
        }
        let hit = self
            .retry
            .run(provider.id().as_str(), || provider.reverse_geocode(at))
            .await
            .map_err(|e| place_provider_error(provider.id(), &e))?;
        self.cache.put(CacheKind::Geocode, &key, &hit, now).await?;
        Ok(hit)
    }
}
