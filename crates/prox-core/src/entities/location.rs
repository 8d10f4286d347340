use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{EntityType, ProviderId};
use crate::geo::Coordinates;

/// Identity of a location record: the pair every pipeline table is keyed by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct EntityRef {
    pub id: i64,
    pub entity_type: EntityType,
}

impl EntityRef {
    #[must_use]
    pub const fn new(id: i64, entity_type: EntityType) -> Self {
        Self { id, entity_type }
    }
}

/// A mappable location record as exposed by the collaborator store.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct LocationEntity {
    pub id: i64,
    pub entity_type: EntityType,
    /// `None` when the stored position is missing or malformed.
    pub coordinates: Option<Coordinates>,
    pub display_name: String,
    /// External identifiers already accepted for this entity, by provider.
    #[serde(default)]
    pub external_ids: BTreeMap<ProviderId, String>,
}

impl LocationEntity {
    #[must_use]
    pub const fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.id, self.entity_type)
    }
}

/// Row returned by radius queries against the geospatial index.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EntitySummary {
    pub id: i64,
    pub entity_type: EntityType,
    pub coordinates: Coordinates,
    pub display_name: String,
}
