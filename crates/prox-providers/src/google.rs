//! Google Places Nearby Search and Geocoding client (international provider).
//!
//! Google reports most failures with HTTP 200 and a `status` field in the
//! body; [`check_status`] maps those onto [`ProviderError`].

use async_trait::async_trait;
use prox_config::KeyedEndpoint;
use prox_core::entities::DiscoveryCandidate;
use prox_core::enums::ProviderId;
use prox_core::geo::Coordinates;

use crate::http::read_json;
use crate::{GeocodeResult, PlaceProvider, PlaceQuery, ProviderError, normalize_categories};

#[derive(serde::Deserialize)]
struct GoogleResponse<T> {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, serde::Deserialize)]
struct PlaceResult {
    place_id: String,
    name: String,
    geometry: Geometry,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(serde::Deserialize)]
struct GeocodeHit {
    place_id: String,
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, serde::Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, serde::Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl LatLng {
    fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::new(self.lat, self.lng)
    }
}

/// Map Google's in-body status onto an error.
fn check_status<T>(resp: GoogleResponse<T>) -> Result<Vec<T>, ProviderError> {
    let GoogleResponse {
        status,
        error_message,
        results,
    } = resp;
    let message = error_message.unwrap_or_else(|| status.clone());
    match status.as_str() {
        "OK" => Ok(results),
        "ZERO_RESULTS" => Ok(Vec::new()),
        "OVER_QUERY_LIMIT" => Err(ProviderError::RateLimited {
            retry_after_secs: 60,
        }),
        "REQUEST_DENIED" => Err(ProviderError::Api {
            status: 403,
            message,
        }),
        "INVALID_REQUEST" => Err(ProviderError::Api {
            status: 400,
            message,
        }),
        _ => Err(ProviderError::Api {
            status: 502,
            message,
        }),
    }
}

fn place_to_candidate(place: PlaceResult) -> Option<DiscoveryCandidate> {
    let coordinates = place.geometry.location.coordinates()?;
    Some(DiscoveryCandidate::new(
        ProviderId::Google,
        place.place_id,
        place.name,
        coordinates,
        normalize_categories(&place.types),
    ))
}

fn hit_to_geocode(hit: GeocodeHit) -> Option<GeocodeResult> {
    Some(GeocodeResult {
        provider: ProviderId::Google,
        coordinates: hit.geometry.location.coordinates()?,
        label: hit.formatted_address,
        external_id: Some(hit.place_id),
    })
}

/// Client for the Google Maps web services.
#[derive(Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleClient {
    #[must_use]
    pub fn new(http: reqwest::Client, endpoint: &KeyedEndpoint) -> Self {
        Self {
            http,
            api_key: endpoint.api_key.clone(),
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path_and_query: &str) -> String {
        format!(
            "{}{path_and_query}&key={}",
            self.base_url,
            urlencoding::encode(&self.api_key)
        )
    }
}

#[async_trait]
impl PlaceProvider for GoogleClient {
    fn id(&self) -> ProviderId {
        ProviderId::Google
    }

    async fn search_nearby(
        &self,
        query: &PlaceQuery,
    ) -> Result<Vec<DiscoveryCandidate>, ProviderError> {
        let url = self.url(&format!(
            "/maps/api/place/nearbysearch/json?location={},{}&radius={}&keyword={}",
            query.center.lat(),
            query.center.lng(),
            query.radius_m.round(),
            urlencoding::encode(&query.name)
        ));
        let resp: GoogleResponse<PlaceResult> = read_json(self.http.get(&url).send().await?).await?;
        Ok(check_status(resp)?
            .into_iter()
            .filter_map(place_to_candidate)
            .take(query.limit)
            .collect())
    }

    async fn geocode(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<GeocodeResult>, ProviderError> {
        let url = self.url(&format!(
            "/maps/api/geocode/json?address={}",
            urlencoding::encode(query)
        ));
        let resp: GoogleResponse<GeocodeHit> = read_json(self.http.get(&url).send().await?).await?;
        Ok(check_status(resp)?
            .into_iter()
            .filter_map(hit_to_geocode)
            .take(limit)
            .collect())
    }

    async fn reverse_geocode(
        &self,
        at: Coordinates,
    ) -> Result<Option<GeocodeResult>, ProviderError> {
        let url = self.url(&format!(
            "/maps/api/geocode/json?latlng={},{}",
            at.lat(),
            at.lng()
        ));
        let resp: GoogleResponse<GeocodeHit> = read_json(self.http.get(&url).send().await?).await?;
        Ok(check_status(resp)?.into_iter().find_map(hit_to_geocode))
    }
}
