//! Nearby-set computation.
//!
//! For one origin, every configured target type is queried within its own
//! radius, distances are computed on the great circle, and the top-K closest
//! are cached together with their reverse-index refs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use prox_config::NearbyConfig;
use prox_core::entities::{EntityRef, LocationEntity, NearbyMatch, NearbySet};
use prox_core::enums::EntityType;
use prox_core::errors::PipelineError;
use prox_core::geo::Coordinates;
use prox_core::store::EntityStore;
use prox_db::ProxDb;

use crate::cache_policy::{CacheKind, CachePolicy, Lookup, keys};

#[derive(Clone)]
pub struct NearbyService {
    db: Arc<ProxDb>,
    store: Arc<dyn EntityStore>,
    cache: CachePolicy,
    config: NearbyConfig,
}

impl NearbyService {
    #[must_use]
    pub fn new(
        db: Arc<ProxDb>,
        store: Arc<dyn EntityStore>,
        cache: CachePolicy,
        config: NearbyConfig,
    ) -> Self {
        Self {
            db,
            store,
            cache,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &NearbyConfig {
        &self.config
    }

    /// Target types to serve: one if requested, otherwise every configured one.
    pub fn targets(&self, target: Option<EntityType>) -> Result<Vec<EntityType>, PipelineError> {
        match target {
            Some(t) if self.config.radius_for(t).is_some() => Ok(vec![t]),
            Some(t) => Err(PipelineError::Input(format!(
                "no nearby radius configured for {t}"
            ))),
            None => Ok(self.config.target_types().collect()),
        }
    }

    /// Recompute and cache every nearby set of `origin`.
    ///
    /// Idempotent: the same dataset always produces the same sets.
    pub async fn compute(&self, origin: EntityRef) -> Result<Vec<NearbySet>, PipelineError> {
        let entity = self
            .store
            .get_entity(origin.id, origin.entity_type)
            .await?;
        let center = require_coordinates(&entity)?;

        let mut sets = Vec::new();
        for (target, radius_m) in self.config.radii.clone() {
            let found = self
                .store
                .query_entities_in_radius(center, radius_m, target)
                .await?;

            let mut set = NearbySet {
                origin_id: origin.id,
                origin_type: origin.entity_type,
                candidate_type: target,
                radius_profile: self.config.radius_profile.clone(),
                radius_m,
                matches: found
                    .iter()
                    .filter(|e| !(e.id == origin.id && e.entity_type == origin.entity_type))
                    .map(|e| NearbyMatch {
                        candidate_id: e.id,
                        distance_m: round_m(center.distance_m(&e.coordinates)),
                    })
                    .filter(|m| m.distance_m <= radius_m)
                    .collect(),
            };
            set.normalize();
            set.matches.truncate(self.config.top_k);

            let key = keys::nearby(origin, target, &self.config.radius_profile);
            self.cache.put(CacheKind::Nearby, &key, &set, Utc::now()).await?;
            let ids: Vec<i64> = set.matches.iter().map(|m| m.candidate_id).collect();
            self.db.replace_nearby_refs(origin, target, &ids).await?;
            sets.push(set);
        }

        tracing::debug!(
            origin_id = origin.id,
            origin_type = %origin.entity_type,
            sets = sets.len(),
            "nearby sets computed"
        );
        Ok(sets)
    }

    /// Whether every configured set of `origin` is fresh and was written at or
    /// after `since`.
    pub async fn fresh_since(
        &self,
        origin: EntityRef,
        since: DateTime<Utc>,
    ) -> Result<bool, PipelineError> {
        let now = Utc::now();
        for target in self.config.target_types() {
            let key = keys::nearby(origin, target, &self.config.radius_profile);
            if !self.cache.fresh_since(&key, since, now).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Cached sets for the requested targets: fresh only if all are fresh.
    pub async fn cached(
        &self,
        origin: EntityRef,
        targets: &[EntityType],
    ) -> Result<Lookup<Vec<NearbySet>>, PipelineError> {
        let now = Utc::now();
        let mut all_fresh = true;
        let mut sets = Vec::with_capacity(targets.len());
        for target in targets {
            let key = keys::nearby(origin, *target, &self.config.radius_profile);
            match self.cache.get::<NearbySet>(&key, now).await? {
                Lookup::Fresh(set) => sets.push(set),
                Lookup::Stale(set) => {
                    all_fresh = false;
                    sets.push(set);
                }
                Lookup::Missing => all_fresh = false,
            }
        }
        Ok(if sets.is_empty() {
            Lookup::Missing
        } else if all_fresh {
            Lookup::Fresh(sets)
        } else {
            Lookup::Stale(sets)
        })
    }
}

pub(crate) fn require_coordinates(entity: &LocationEntity) -> Result<Coordinates, PipelineError> {
    entity.coordinates.ok_or_else(|| {
        PipelineError::Input(format!(
            "{} {} has no valid coordinates",
            entity.entity_type, entity.id
        ))
    })
}

/// Centimetre precision keeps cached values stable across float noise.
fn round_m(d: f64) -> f64 {
    (d * 100.0).round() / 100.0
}
