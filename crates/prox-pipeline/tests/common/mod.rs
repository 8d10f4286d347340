//! Fakes shared by the pipeline integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use prox_config::ProximaConfig;
use prox_core::entities::{DiscoveryCandidate, EntityRef, EntitySummary, LocationEntity};
use prox_core::enums::{EntityType, ProviderId};
use prox_core::errors::CoreError;
use prox_core::geo::Coordinates;
use prox_core::store::EntityStore;
use prox_db::ProxDb;
use prox_pipeline::Pipeline;
use prox_providers::{
    GeocodeResult, IsochroneProvider, PlaceProvider, PlaceQuery, ProviderError, Providers,
};

/// E from the nearby scenario: Prague, Vinohrady.
pub fn origin_point() -> Coordinates {
    Coordinates::new(50.075, 14.438).unwrap()
}

/// Defaults with fast provider retries.
pub fn test_config() -> ProximaConfig {
    let mut config = ProximaConfig::default();
    config.discovery.provider_attempts = 2;
    config.discovery.provider_backoff_ms = 1;
    config
}

pub async fn memory_db() -> Arc<ProxDb> {
    Arc::new(ProxDb::open_local(":memory:").await.unwrap())
}

// ---------------------------------------------------------------------------
// Entity store
// ---------------------------------------------------------------------------

/// An attach call recorded by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct Attached {
    pub entity: EntityRef,
    pub provider: ProviderId,
    pub external_id: String,
    pub metadata: serde_json::Value,
}

#[derive(Default)]
pub struct MemoryStore {
    entities: Mutex<BTreeMap<EntityRef, LocationEntity>>,
    pub attached: Mutex<Vec<Attached>>,
}

impl MemoryStore {
    pub fn insert(&self, id: i64, entity_type: EntityType, name: &str, at: Option<Coordinates>) {
        self.entities.lock().unwrap().insert(
            EntityRef::new(id, entity_type),
            LocationEntity {
                id,
                entity_type,
                coordinates: at,
                display_name: name.to_string(),
                external_ids: BTreeMap::new(),
            },
        );
    }

    pub fn attached(&self) -> Vec<Attached> {
        self.attached.lock().unwrap().clone()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get_entity(
        &self,
        id: i64,
        entity_type: EntityType,
    ) -> Result<LocationEntity, CoreError> {
        self.entities
            .lock()
            .unwrap()
            .get(&EntityRef::new(id, entity_type))
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity_type: entity_type.to_string(),
                id: id.to_string(),
            })
    }

    async fn query_entities_in_radius(
        &self,
        center: Coordinates,
        radius_m: f64,
        entity_type: EntityType,
    ) -> Result<Vec<EntitySummary>, CoreError> {
        Ok(self
            .entities
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.entity_type == entity_type)
            .filter_map(|e| {
                let at = e.coordinates?;
                (center.distance_m(&at) <= radius_m).then(|| EntitySummary {
                    id: e.id,
                    entity_type: e.entity_type,
                    coordinates: at,
                    display_name: e.display_name.clone(),
                })
            })
            .collect())
    }

    async fn attach_external_id(
        &self,
        entity_id: i64,
        entity_type: EntityType,
        provider: ProviderId,
        external_id: &str,
        metadata: serde_json::Value,
    ) -> Result<(), CoreError> {
        let entity = EntityRef::new(entity_id, entity_type);
        let mut entities = self.entities.lock().unwrap();
        let location = entities.get_mut(&entity).ok_or_else(|| CoreError::NotFound {
            entity_type: entity_type.to_string(),
            id: entity_id.to_string(),
        })?;
        location
            .external_ids
            .insert(provider, external_id.to_string());
        self.attached.lock().unwrap().push(Attached {
            entity,
            provider,
            external_id: external_id.to_string(),
            metadata,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Place provider answering from a fixed candidate list, or failing.
pub struct FakePlaces {
    id: ProviderId,
    candidates: Vec<DiscoveryCandidate>,
    failures: Mutex<VecDeque<ProviderError>>,
    always_fail: bool,
    pub calls: AtomicUsize,
}

impl FakePlaces {
    pub fn answering(id: ProviderId, candidates: Vec<DiscoveryCandidate>) -> Arc<Self> {
        Arc::new(Self {
            id,
            candidates,
            failures: Mutex::new(VecDeque::new()),
            always_fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(id: ProviderId) -> Arc<Self> {
        Arc::new(Self {
            id,
            candidates: Vec::new(),
            failures: Mutex::new(VecDeque::new()),
            always_fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    /// Fail the next calls with these errors, then answer normally.
    pub fn flaky(
        id: ProviderId,
        candidates: Vec<DiscoveryCandidate>,
        failures: Vec<ProviderError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            candidates,
            failures: Mutex::new(failures.into()),
            always_fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn unavailable() -> ProviderError {
    ProviderError::Api {
        status: 503,
        message: "service unavailable".into(),
    }
}

#[async_trait]
impl PlaceProvider for FakePlaces {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn search_nearby(
        &self,
        _query: &PlaceQuery,
    ) -> Result<Vec<DiscoveryCandidate>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.always_fail {
            return Err(unavailable());
        }
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self.candidates.clone())
    }

    async fn geocode(
        &self,
        query: &str,
        _limit: usize,
    ) -> Result<Vec<GeocodeResult>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![GeocodeResult {
            provider: self.id,
            label: query.to_string(),
            coordinates: origin_point(),
            external_id: None,
        }])
    }

    async fn reverse_geocode(
        &self,
        at: Coordinates,
    ) -> Result<Option<GeocodeResult>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(GeocodeResult {
            provider: self.id,
            label: "Vinohradská 1".into(),
            coordinates: at,
            external_id: None,
        }))
    }
}

/// Isochrone provider that answers after a delay.
pub struct SlowIsochrones {
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl SlowIsochrones {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl IsochroneProvider for SlowIsochrones {
    async fn isochrones(
        &self,
        center: Coordinates,
        _profile: &str,
        ranges_secs: &[u32],
    ) -> Result<serde_json::Value, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let features: Vec<serde_json::Value> = ranges_secs
            .iter()
            .map(|r| {
                serde_json::json!({
                    "type": "Feature",
                    "properties": { "value": r, "center": [center.lng(), center.lat()] },
                    "geometry": { "type": "Polygon", "coordinates": [] }
                })
            })
            .collect();
        Ok(serde_json::json!({ "type": "FeatureCollection", "features": features }))
    }
}

pub fn candidate(
    provider: ProviderId,
    id: &str,
    name: &str,
    at: Coordinates,
    categories: &[&str],
) -> DiscoveryCandidate {
    DiscoveryCandidate::new(
        provider,
        id,
        name,
        at,
        categories.iter().map(|c| (*c).to_string()).collect(),
    )
}

/// A pipeline over `db` and `store` with the given providers.
pub fn pipeline(
    config: &ProximaConfig,
    db: &Arc<ProxDb>,
    store: Arc<dyn EntityStore>,
    providers: Providers,
) -> Pipeline {
    Pipeline::new(config, Arc::clone(db), store, providers)
}
