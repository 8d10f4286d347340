//! Mapy.cz REST API client (domestic provider).
//!
//! Place search uses `/v1/geocode` with `type=poi` and `preferNear`, which
//! ranks results by proximity to the entity. Items carry no stable id for
//! every type, so a positional id is synthesized when `id` is absent.

use async_trait::async_trait;
use prox_config::KeyedEndpoint;
use prox_core::entities::DiscoveryCandidate;
use prox_core::enums::ProviderId;
use prox_core::geo::Coordinates;

use crate::http::read_json;
use crate::{GeocodeResult, PlaceProvider, PlaceQuery, ProviderError, normalize_categories};

#[derive(serde::Deserialize)]
struct MapyResponse {
    #[serde(default)]
    items: Vec<MapyItem>,
}

#[derive(serde::Deserialize)]
struct MapyItem {
    #[serde(default)]
    id: Option<serde_json::Value>,
    name: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(rename = "type", default)]
    item_type: Option<String>,
    #[serde(default)]
    location: Option<String>,
    position: MapyPosition,
}

#[derive(serde::Deserialize)]
struct MapyPosition {
    lon: f64,
    lat: f64,
}

impl MapyItem {
    fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::new(self.position.lat, self.position.lon)
    }

    fn external_id(&self) -> String {
        match &self.id {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => format!(
                "{}@{:.6},{:.6}",
                self.item_type.as_deref().unwrap_or("item"),
                self.position.lat,
                self.position.lon
            ),
        }
    }

    fn into_candidate(self) -> Option<DiscoveryCandidate> {
        let coordinates = self.coordinates()?;
        let external_id = self.external_id();
        let categories = normalize_categories(self.label.iter());
        Some(DiscoveryCandidate::new(
            ProviderId::Mapy,
            external_id,
            self.name,
            coordinates,
            categories,
        ))
    }

    fn into_geocode(self) -> Option<GeocodeResult> {
        let coordinates = self.coordinates()?;
        let external_id = self.id.is_some().then(|| self.external_id());
        let label = match &self.location {
            Some(loc) if !loc.is_empty() => format!("{}, {loc}", self.name),
            _ => self.name,
        };
        Some(GeocodeResult {
            provider: ProviderId::Mapy,
            label,
            coordinates,
            external_id,
        })
    }
}

/// Client for `api.mapy.cz`.
#[derive(Clone)]
pub struct MapyClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl MapyClient {
    #[must_use]
    pub fn new(http: reqwest::Client, endpoint: &KeyedEndpoint) -> Self {
        Self {
            http,
            api_key: endpoint.api_key.clone(),
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, path_and_query: &str) -> Result<MapyResponse, ProviderError> {
        let url = format!(
            "{}{path_and_query}&lang=cs&apikey={}",
            self.base_url,
            urlencoding::encode(&self.api_key)
        );
        read_json(self.http.get(&url).send().await?).await
    }
}

#[async_trait]
impl PlaceProvider for MapyClient {
    fn id(&self) -> ProviderId {
        ProviderId::Mapy
    }

    async fn search_nearby(
        &self,
        query: &PlaceQuery,
    ) -> Result<Vec<DiscoveryCandidate>, ProviderError> {
        let data = self
            .get(&format!(
                "/v1/geocode?query={}&type=poi&limit={}&preferNear={},{}&preferNearPrecision={}",
                urlencoding::encode(&query.name),
                query.limit.clamp(1, 15),
                query.center.lng(),
                query.center.lat(),
                query.radius_m.round()
            ))
            .await?;
        Ok(data
            .items
            .into_iter()
            .filter_map(MapyItem::into_candidate)
            .collect())
    }

    async fn geocode(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<GeocodeResult>, ProviderError> {
        let data = self
            .get(&format!(
                "/v1/geocode?query={}&limit={}",
                urlencoding::encode(query),
                limit.clamp(1, 15)
            ))
            .await?;
        Ok(data
            .items
            .into_iter()
            .filter_map(MapyItem::into_geocode)
            .collect())
    }

    async fn reverse_geocode(
        &self,
        at: Coordinates,
    ) -> Result<Option<GeocodeResult>, ProviderError> {
        let data = self
            .get(&format!("/v1/rgeocode?lon={}&lat={}", at.lng(), at.lat()))
            .await?;
        Ok(data.items.into_iter().find_map(MapyItem::into_geocode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FIXTURE: &str = r#"{
        "items": [
            {
                "id": 1047205,
                "name": "Kavárna Dobrá chuť",
                "label": "Kavárna",
                "type": "poi",
                "location": "Praha 1",
                "position": {"lon": 14.4383, "lat": 50.0753}
            },
            {
                "name": "Dobrá chuť",
                "label": "Restaurace",
                "type": "poi",
                "position": {"lon": 14.45, "lat": 50.08}
            },
            {
                "name": "Broken",
                "position": {"lon": 214.0, "lat": 50.0}
            }
        ]
    }"#;

    #[test]
    fn parse_mapy_response() {
        let data: MapyResponse = serde_json::from_str(FIXTURE).unwrap();
        assert_eq!(data.items.len(), 3);
        assert_eq!(data.items[0].name, "Kavárna Dobrá chuť");
        assert!((data.items[0].position.lat - 50.0753).abs() < 1e-9);
    }

    #[test]
    fn maps_to_candidates_and_drops_invalid_positions() {
        let data: MapyResponse = serde_json::from_str(FIXTURE).unwrap();
        let candidates: Vec<DiscoveryCandidate> = data
            .items
            .into_iter()
            .filter_map(MapyItem::into_candidate)
            .collect();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].external_id, "1047205");
        assert_eq!(candidates[0].source_provider, ProviderId::Mapy);
        assert_eq!(candidates[0].categories, vec!["kavárna"]);
        assert_eq!(candidates[1].external_id, "poi@50.080000,14.450000");
    }

    #[test]
    fn geocode_label_includes_location() {
        let data: MapyResponse = serde_json::from_str(FIXTURE).unwrap();
        let first = data.items.into_iter().next().unwrap().into_geocode().unwrap();
        assert_eq!(first.label, "Kavárna Dobrá chuť, Praha 1");
        assert_eq!(first.external_id.as_deref(), Some("1047205"));
    }

    #[test]
    fn empty_body_parses_as_no_items() {
        let data: MapyResponse = serde_json::from_str("{}").unwrap();
        assert!(data.items.is_empty());
    }
}
