//! OpenStreetMap Nominatim client (keyless international provider).
//!
//! Searches are bounded to a viewbox around the entity. External ids use
//! the OSM object reference (`node/123`), which survives Nominatim reimports
//! while `place_id` does not.

use async_trait::async_trait;
use prox_core::entities::DiscoveryCandidate;
use prox_core::enums::ProviderId;
use prox_core::geo::{BoundingBox, Coordinates};

use crate::http::read_json;
use crate::{GeocodeResult, PlaceProvider, PlaceQuery, ProviderError, normalize_categories};

#[derive(serde::Deserialize)]
struct NominatimPlace {
    osm_type: Option<String>,
    osm_id: Option<u64>,
    place_id: Option<u64>,
    lat: String,
    lon: String,
    #[serde(default)]
    name: Option<String>,
    display_name: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(rename = "type", default)]
    place_type: Option<String>,
}

/// `/reverse` answers `{"error": "..."}` when nothing is nearby.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ReverseResponse {
    Found(NominatimPlace),
    Missing { error: String },
}

impl NominatimPlace {
    fn coordinates(&self) -> Option<Coordinates> {
        let lat = self.lat.parse().ok()?;
        let lon = self.lon.parse().ok()?;
        Coordinates::new(lat, lon)
    }

    fn external_id(&self) -> Option<String> {
        match (&self.osm_type, self.osm_id, self.place_id) {
            (Some(kind), Some(id), _) => Some(format!("{kind}/{id}")),
            (_, _, Some(place_id)) => Some(format!("place/{place_id}")),
            _ => None,
        }
    }

    fn into_candidate(self) -> Option<DiscoveryCandidate> {
        let coordinates = self.coordinates()?;
        let external_id = self.external_id()?;
        let name = match self.name {
            Some(name) if !name.is_empty() => name,
            _ => self
                .display_name
                .split(',')
                .next()
                .unwrap_or_default()
                .to_string(),
        };
        let categories = normalize_categories(self.category.iter().chain(&self.place_type));
        Some(DiscoveryCandidate::new(
            ProviderId::Nominatim,
            external_id,
            name,
            coordinates,
            categories,
        ))
    }

    fn into_geocode(self) -> Option<GeocodeResult> {
        Some(GeocodeResult {
            provider: ProviderId::Nominatim,
            coordinates: self.coordinates()?,
            external_id: self.external_id(),
            label: self.display_name,
        })
    }
}

/// Client for a Nominatim instance.
#[derive(Clone)]
pub struct NominatimClient {
    http: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PlaceProvider for NominatimClient {
    fn id(&self) -> ProviderId {
        ProviderId::Nominatim
    }

    async fn search_nearby(
        &self,
        query: &PlaceQuery,
    ) -> Result<Vec<DiscoveryCandidate>, ProviderError> {
        let bbox = BoundingBox::around(&query.center, query.radius_m);
        let url = format!(
            "{}/search?q={}&format=jsonv2&limit={}&viewbox={},{},{},{}&bounded=1",
            self.base_url,
            urlencoding::encode(&query.name),
            query.limit.clamp(1, 40),
            bbox.min_lng,
            bbox.max_lat,
            bbox.max_lng,
            bbox.min_lat
        );
        let places: Vec<NominatimPlace> = read_json(self.http.get(&url).send().await?).await?;
        Ok(places
            .into_iter()
            .filter_map(NominatimPlace::into_candidate)
            .collect())
    }

    async fn geocode(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<GeocodeResult>, ProviderError> {
        let url = format!(
            "{}/search?q={}&format=jsonv2&limit={}",
            self.base_url,
            urlencoding::encode(query),
            limit.clamp(1, 40)
        );
        let places: Vec<NominatimPlace> = read_json(self.http.get(&url).send().await?).await?;
        Ok(places
            .into_iter()
            .filter_map(NominatimPlace::into_geocode)
            .collect())
    }

    async fn reverse_geocode(
        &self,
        at: Coordinates,
    ) -> Result<Option<GeocodeResult>, ProviderError> {
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=jsonv2",
            self.base_url,
            at.lat(),
            at.lng()
        );
        match read_json(self.http.get(&url).send().await?).await? {
            ReverseResponse::Found(place) => Ok(place.into_geocode()),
            ReverseResponse::Missing { error } => {
                tracing::debug!(%error, "nominatim reverse found nothing");
                Ok(None)
            }
        }
    }
}
