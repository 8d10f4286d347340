use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::EntityType;

/// A raw cache row: value plus expiry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Fresh means strictly before `expires_at`.
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// One entry of a nearby set.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct NearbyMatch {
    pub candidate_id: i64,
    pub distance_m: f64,
}

/// Value of a nearby cache entry: candidates of one type around one origin.
///
/// `matches` is sorted ascending by `distance_m`, ties by `candidate_id`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct NearbySet {
    pub origin_id: i64,
    pub origin_type: EntityType,
    pub candidate_type: EntityType,
    pub radius_profile: String,
    pub radius_m: f64,
    pub matches: Vec<NearbyMatch>,
}

impl NearbySet {
    /// Sort into canonical order.
    pub fn normalize(&mut self) {
        self.matches.sort_by(|a, b| {
            a.distance_m
                .total_cmp(&b.distance_m)
                .then(a.candidate_id.cmp(&b.candidate_id))
        });
    }

    /// Keep at most `limit` closest matches.
    #[must_use]
    pub fn limited(mut self, limit: Option<usize>) -> Self {
        if let Some(limit) = limit {
            self.matches.truncate(limit);
        }
        self
    }
}

/// Value of an isochrone cache entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct IsochroneSet {
    pub origin_id: i64,
    pub profile: String,
    /// Ranges in seconds the polygons were computed for, ascending.
    pub range_set: Vec<u32>,
    /// GeoJSON `FeatureCollection` as returned by the isochrone provider.
    pub polygons: serde_json::Value,
}
