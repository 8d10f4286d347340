use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{DiscoveryStatus, EntityType, ProviderId};
use crate::geo::Coordinates;

/// A provider record that might be the same real-world place as an entity.
///
/// Providers normalize into this shape at the adapter boundary; scoring fills
/// `confidence_score`, `distance_m`, and `match_reasons`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DiscoveryCandidate {
    pub source_provider: ProviderId,
    pub external_id: String,
    pub candidate_name: String,
    pub candidate_coordinates: Coordinates,
    /// Provider category labels, lowercased.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Score in `[0, 100]`.
    #[serde(default)]
    pub confidence_score: f64,
    #[serde(default)]
    pub distance_m: f64,
    #[serde(default)]
    pub match_reasons: Vec<String>,
}

impl DiscoveryCandidate {
    /// Unscored candidate as produced by a provider adapter.
    #[must_use]
    pub fn new(
        source_provider: ProviderId,
        external_id: impl Into<String>,
        candidate_name: impl Into<String>,
        candidate_coordinates: Coordinates,
        categories: Vec<String>,
    ) -> Self {
        Self {
            source_provider,
            external_id: external_id.into(),
            candidate_name: candidate_name.into(),
            candidate_coordinates,
            categories,
            confidence_score: 0.0,
            distance_m: 0.0,
            match_reasons: Vec::new(),
        }
    }
}

/// Last discovery outcome for an entity.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DiscoveryState {
    pub entity_id: i64,
    pub entity_type: EntityType,
    pub status: DiscoveryStatus,
    pub reason: Option<String>,
    /// Consecutive failed runs; reset on success.
    pub failures: u32,
    pub updated_at: DateTime<Utc>,
}
