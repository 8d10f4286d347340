//! Discovery scoring and provider selection configuration.

use prox_core::geo::BoundingBox;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_distance_weight() -> f64 {
    0.5
}

const fn default_name_weight() -> f64 {
    0.35
}

const fn default_type_weight() -> f64 {
    0.15
}

const fn default_full_score_radius_m() -> f64 {
    50.0
}

const fn default_distance_cutoff_m() -> f64 {
    500.0
}

const fn default_accept_threshold() -> f64 {
    75.0
}

const fn default_hard_distance_cap_m() -> f64 {
    200.0
}

const fn default_min_relevance() -> f64 {
    20.0
}

const fn default_search_radius_m() -> f64 {
    500.0
}

const fn default_provider_attempts() -> u32 {
    3
}

const fn default_provider_backoff_ms() -> u64 {
    500
}

/// Czech Republic, where the domestic provider has the better coverage.
const fn default_domestic_bbox() -> BoundingBox {
    BoundingBox {
        min_lat: 48.55,
        min_lng: 12.09,
        max_lat: 51.06,
        max_lng: 18.87,
    }
}

/// Relative weights of the three score components.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ScoreWeights {
    #[serde(default = "default_distance_weight")]
    pub distance: f64,

    #[serde(default = "default_name_weight")]
    pub name: f64,

    #[serde(default = "default_type_weight", rename = "type")]
    pub category: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            distance: default_distance_weight(),
            name: default_name_weight(),
            category: default_type_weight(),
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.distance + self.name + self.category
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub weights: ScoreWeights,

    /// Candidates this close get the full distance score.
    #[serde(default = "default_full_score_radius_m")]
    pub full_score_radius_m: f64,

    /// Distance score reaches zero here.
    #[serde(default = "default_distance_cutoff_m")]
    pub distance_cutoff_m: f64,

    /// Minimum score (0-100, inclusive) for auto-accept.
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: f64,

    /// Maximum distance (inclusive) for auto-accept regardless of score.
    #[serde(default = "default_hard_distance_cap_m")]
    pub hard_distance_cap_m: f64,

    /// Candidates below this score are dropped instead of reviewed.
    #[serde(default = "default_min_relevance")]
    pub min_relevance: f64,

    /// Radius passed to provider place searches.
    #[serde(default = "default_search_radius_m")]
    pub search_radius_m: f64,

    #[serde(default = "default_domestic_bbox")]
    pub domestic_bbox: BoundingBox,

    /// Attempts per provider call before it counts as failed.
    #[serde(default = "default_provider_attempts")]
    pub provider_attempts: u32,

    #[serde(default = "default_provider_backoff_ms")]
    pub provider_backoff_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            full_score_radius_m: default_full_score_radius_m(),
            distance_cutoff_m: default_distance_cutoff_m(),
            accept_threshold: default_accept_threshold(),
            hard_distance_cap_m: default_hard_distance_cap_m(),
            min_relevance: default_min_relevance(),
            search_radius_m: default_search_radius_m(),
            domestic_bbox: default_domestic_bbox(),
            provider_attempts: default_provider_attempts(),
            provider_backoff_ms: default_provider_backoff_ms(),
        }
    }
}

impl DiscoveryConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        if [w.distance, w.name, w.category]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(ConfigError::invalid("discovery.weights", "must be non-negative"));
        }
        if (w.sum() - 1.0).abs() > 1e-6 {
            return Err(ConfigError::invalid(
                "discovery.weights",
                format!("must sum to 1.0, got {}", w.sum()),
            ));
        }
        if w.distance < w.name || w.distance < w.category {
            return Err(ConfigError::invalid(
                "discovery.weights.distance",
                "distance must carry the largest weight",
            ));
        }
        if self.full_score_radius_m >= self.distance_cutoff_m {
            return Err(ConfigError::invalid(
                "discovery.distance_cutoff_m",
                "must exceed full_score_radius_m",
            ));
        }
        if !(0.0..=100.0).contains(&self.accept_threshold) {
            return Err(ConfigError::invalid("discovery.accept_threshold", "must be in 0..=100"));
        }
        if self.min_relevance > self.accept_threshold {
            return Err(ConfigError::invalid(
                "discovery.min_relevance",
                "must not exceed accept_threshold",
            ));
        }
        if self.provider_attempts == 0 {
            return Err(ConfigError::invalid("discovery.provider_attempts", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prox_core::geo::Coordinates;

    #[test]
    fn defaults_are_valid() {
        assert!(DiscoveryConfig::default().validate().is_ok());
    }

    #[test]
    fn prague_is_domestic_vienna_is_not() {
        let bbox = DiscoveryConfig::default().domestic_bbox;
        assert!(bbox.contains(&Coordinates::new(50.075, 14.438).unwrap()));
        assert!(!bbox.contains(&Coordinates::new(48.208, 16.373).unwrap()));
    }

    #[test]
    fn name_dominant_weights_rejected() {
        let mut config = DiscoveryConfig::default();
        config.weights = ScoreWeights {
            distance: 0.2,
            name: 0.7,
            category: 0.1,
        };
        assert!(config.validate().is_err());
    }
}
