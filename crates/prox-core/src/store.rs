//! The narrow interface the pipeline consumes from the collaborator entity store.

use async_trait::async_trait;

use crate::entities::{EntitySummary, LocationEntity};
use crate::enums::{EntityType, ProviderId};
use crate::errors::CoreError;
use crate::geo::Coordinates;

/// Read access to location records plus the single write-back the pipeline needs.
///
/// Implementations must return `CoreError::NotFound` for unknown entities so
/// the processors can classify the failure as an input error.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get_entity(
        &self,
        id: i64,
        entity_type: EntityType,
    ) -> Result<LocationEntity, CoreError>;

    /// Entities of `entity_type` within `radius_m` of `center`, in no particular order.
    ///
    /// Entities without valid coordinates are never returned.
    async fn query_entities_in_radius(
        &self,
        center: Coordinates,
        radius_m: f64,
        entity_type: EntityType,
    ) -> Result<Vec<EntitySummary>, CoreError>;

    /// Record an accepted provider identifier as fallback metadata on the entity.
    async fn attach_external_id(
        &self,
        entity_id: i64,
        entity_type: EntityType,
        provider: ProviderId,
        external_id: &str,
        metadata: serde_json::Value,
    ) -> Result<(), CoreError>;
}
