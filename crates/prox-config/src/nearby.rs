//! Nearby-set computation configuration.

use std::collections::BTreeMap;

use prox_core::enums::EntityType;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn default_radius_profile() -> String {
    "default".to_string()
}

const fn default_top_k() -> usize {
    25
}

const fn default_superset_factor() -> f64 {
    1.5
}

/// Search radius per target type. POIs are only interesting close by.
fn default_radii() -> BTreeMap<EntityType, f64> {
    BTreeMap::from([
        (EntityType::Charger, 2_000.0),
        (EntityType::Poi, 1_000.0),
        (EntityType::CampSpot, 5_000.0),
    ])
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NearbyConfig {
    /// Name stored in cache keys; change it when the radii change materially.
    #[serde(default = "default_radius_profile")]
    pub radius_profile: String,

    /// Target types and their search radius in metres.
    #[serde(default = "default_radii")]
    pub radii: BTreeMap<EntityType, f64>,

    /// Closest matches kept per (origin, target type).
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Multiplier on the largest radius used when looking for affected origins.
    #[serde(default = "default_superset_factor")]
    pub superset_factor: f64,
}

impl Default for NearbyConfig {
    fn default() -> Self {
        Self {
            radius_profile: default_radius_profile(),
            radii: default_radii(),
            top_k: default_top_k(),
            superset_factor: default_superset_factor(),
        }
    }
}

impl NearbyConfig {
    pub fn radius_for(&self, target: EntityType) -> Option<f64> {
        self.radii.get(&target).copied()
    }

    /// Target types in stable order.
    pub fn target_types(&self) -> impl Iterator<Item = EntityType> + '_ {
        self.radii.keys().copied()
    }

    /// Radius that covers every origin whose nearby set could include a given entity.
    pub fn superset_radius(&self) -> f64 {
        let max = self.radii.values().copied().fold(0.0_f64, f64::max);
        max * self.superset_factor
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.radius_profile.trim().is_empty() {
            return Err(ConfigError::invalid("nearby.radius_profile", "must not be empty"));
        }
        if self.radii.is_empty() {
            return Err(ConfigError::invalid("nearby.radii", "at least one target type"));
        }
        if let Some((ty, r)) = self
            .radii
            .iter()
            .find(|(_, r)| !r.is_finite() || **r <= 0.0)
        {
            return Err(ConfigError::invalid(
                "nearby.radii",
                format!("radius for {ty} must be positive, got {r}"),
            ));
        }
        if self.top_k == 0 {
            return Err(ConfigError::invalid("nearby.top_k", "must be at least 1"));
        }
        if self.superset_factor < 1.0 {
            return Err(ConfigError::invalid("nearby.superset_factor", "must be >= 1.0"));
        }
        Ok(())
    }
}
