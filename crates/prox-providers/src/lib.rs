//! # prox-providers
//!
//! HTTP clients for the external geodata services Proxima reconciles against:
//! - Mapy.cz (domestic place search, geocoding)
//! - Google Places / Geocoding (international)
//! - OpenStreetMap Nominatim (international, keyless)
//! - openrouteservice (walking isochrones)
//!
//! Every response is normalized at this boundary: place results become
//! [`DiscoveryCandidate`]s with lowercased categories, geocoding results
//! become [`GeocodeResult`]s. Scoring happens in the pipeline.

pub mod google;
pub mod mapy;
pub mod nominatim;
pub mod ors;

mod error;
mod http;

pub use error::ProviderError;
pub use google::GoogleClient;
pub use mapy::MapyClient;
pub use nominatim::NominatimClient;
pub use ors::OrsClient;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prox_config::ProvidersConfig;
use prox_core::entities::DiscoveryCandidate;
use prox_core::enums::{EntityType, ProviderId};
use prox_core::geo::Coordinates;
use serde::{Deserialize, Serialize};

// ── Types ──────────────────────────────────────────────────────────

/// Place search near a known position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceQuery {
    /// Free-text name to look for, usually the entity's display name.
    pub name: String,
    pub center: Coordinates,
    pub radius_m: f64,
    pub entity_type: EntityType,
    pub limit: usize,
}

/// Normalized forward or reverse geocoding hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub provider: ProviderId,
    pub label: String,
    pub coordinates: Coordinates,
    pub external_id: Option<String>,
}

// ── Traits ─────────────────────────────────────────────────────────

/// A provider that can search places and geocode.
#[async_trait]
pub trait PlaceProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Candidates near `query.center` matching `query.name`.
    async fn search_nearby(
        &self,
        query: &PlaceQuery,
    ) -> Result<Vec<DiscoveryCandidate>, ProviderError>;

    async fn geocode(&self, query: &str, limit: usize)
    -> Result<Vec<GeocodeResult>, ProviderError>;

    async fn reverse_geocode(
        &self,
        at: Coordinates,
    ) -> Result<Option<GeocodeResult>, ProviderError>;
}

/// A provider that computes travel-time polygons.
#[async_trait]
pub trait IsochroneProvider: Send + Sync {
    /// GeoJSON `FeatureCollection` with one polygon per range (seconds).
    async fn isochrones(
        &self,
        center: Coordinates,
        profile: &str,
        ranges_secs: &[u32],
    ) -> Result<serde_json::Value, ProviderError>;
}

// ── Construction ───────────────────────────────────────────────────

/// Build the shared HTTP client.
///
/// # Panics
///
/// Panics if the underlying `reqwest::Client` fails to build.
#[must_use]
pub fn http_client(config: &ProvidersConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .expect("reqwest client should build")
}

/// The configured providers, split by region.
#[derive(Clone, Default)]
pub struct Providers {
    /// Preferred inside the domestic bounding box.
    pub domestic: Vec<Arc<dyn PlaceProvider>>,
    /// Used abroad, and as fallback when domestic results are weak.
    pub international: Vec<Arc<dyn PlaceProvider>>,
    pub isochrone: Option<Arc<dyn IsochroneProvider>>,
}

impl Providers {
    /// Instantiate every provider that has credentials.
    ///
    /// Google comes before Nominatim so that, when both are configured, the
    /// keyed service answers first.
    #[must_use]
    pub fn from_config(config: &ProvidersConfig) -> Self {
        let http = http_client(config);
        let mut providers = Self::default();

        if config.mapy.is_configured() {
            providers
                .domestic
                .push(Arc::new(MapyClient::new(http.clone(), &config.mapy)));
        }
        if config.google.is_configured() {
            providers
                .international
                .push(Arc::new(GoogleClient::new(http.clone(), &config.google)));
        }
        if config.nominatim.enabled {
            providers.international.push(Arc::new(NominatimClient::new(
                http.clone(),
                &config.nominatim.base_url,
            )));
        }
        if config.isochrone.is_configured() {
            providers.isochrone = Some(Arc::new(OrsClient::new(http, &config.isochrone)));
        }

        tracing::debug!(
            domestic = providers.domestic.len(),
            international = providers.international.len(),
            isochrone = providers.isochrone.is_some(),
            "providers configured"
        );
        providers
    }

    /// Every place provider, domestic first.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<dyn PlaceProvider>> {
        self.domestic
            .iter()
            .chain(&self.international)
            .cloned()
            .collect()
    }

    /// Look up a configured place provider by id.
    #[must_use]
    pub fn get(&self, id: ProviderId) -> Option<Arc<dyn PlaceProvider>> {
        self.all().into_iter().find(|p| p.id() == id)
    }
}

/// Lowercase provider category labels and turn `snake_case` tags into words.
pub(crate) fn normalize_categories<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = labels
        .into_iter()
        .map(|l| l.as_ref().trim().replace('_', " ").to_lowercase())
        .filter(|l| !l.is_empty())
        .collect();
    out.dedup();
    out
}
