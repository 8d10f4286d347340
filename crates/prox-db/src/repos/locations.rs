//! Location records: the SQL stand-in for the collaborator entity store.
//!
//! The pipeline never creates or deletes locations itself. `upsert_location`
//! and `remove_location` exist for the CLI and tests that drive the
//! mutation → enqueue path.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use prox_core::entities::{EntityRef, EntitySummary, LocationEntity};
use prox_core::enums::{EntityType, ProviderId};
use prox_core::errors::CoreError;
use prox_core::geo::{BoundingBox, Coordinates};
use prox_core::store::EntityStore;

use crate::ProxDb;
use crate::error::DatabaseError;
use crate::helpers::{fmt_ts, parse_enum, to_json};

const SELECT_COLS: &str = "id, entity_type, lat, lng, display_name";

fn row_to_location(row: &libsql::Row) -> Result<LocationEntity, DatabaseError> {
    Ok(LocationEntity {
        id: row.get(0)?,
        entity_type: parse_enum(&row.get::<String>(1)?)?,
        coordinates: Coordinates::from_parts(row.get::<Option<f64>>(2)?, row.get::<Option<f64>>(3)?),
        display_name: row.get(4)?,
        external_ids: BTreeMap::new(),
    })
}

impl ProxDb {
    /// Insert or update a location. Coordinates may be absent.
    pub async fn upsert_location(
        &self,
        entity: EntityRef,
        coordinates: Option<Coordinates>,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO locations (id, entity_type, lat, lng, display_name, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(entity_type, id) DO UPDATE SET
                    lat = excluded.lat,
                    lng = excluded.lng,
                    display_name = excluded.display_name,
                    updated_at = excluded.updated_at",
                libsql::params![
                    entity.id,
                    entity.entity_type.as_str(),
                    coordinates.map(|c| c.lat()),
                    coordinates.map(|c| c.lng()),
                    display_name,
                    fmt_ts(now)
                ],
            )
            .await?;
        Ok(())
    }

    /// Delete a location and its external ids. Returns whether it existed.
    pub async fn remove_location(&self, entity: EntityRef) -> Result<bool, DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "DELETE FROM locations WHERE id = ?1 AND entity_type = ?2",
                libsql::params![entity.id, entity.entity_type.as_str()],
            )
            .await?;
        Ok(affected > 0)
    }

    /// Location with its accepted external ids.
    pub async fn get_location(
        &self,
        entity: EntityRef,
    ) -> Result<Option<LocationEntity>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM locations WHERE id = ?1 AND entity_type = ?2"),
                libsql::params![entity.id, entity.entity_type.as_str()],
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        let mut location = row_to_location(&row)?;

        let mut rows = self
            .conn()
            .query(
                "SELECT provider, external_id FROM location_external_ids
                 WHERE entity_id = ?1 AND entity_type = ?2",
                libsql::params![entity.id, entity.entity_type.as_str()],
            )
            .await?;
        while let Some(row) = rows.next().await? {
            let provider: ProviderId = parse_enum(&row.get::<String>(0)?)?;
            location.external_ids.insert(provider, row.get(1)?);
        }
        Ok(Some(location))
    }

    /// Ids of every location of a type, ascending.
    pub async fn list_location_ids(
        &self,
        entity_type: EntityType,
    ) -> Result<Vec<i64>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id FROM locations WHERE entity_type = ?1 ORDER BY id",
                [entity_type.as_str()],
            )
            .await?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    /// Locations of `entity_type` with valid coordinates inside `bbox`.
    pub async fn locations_in_bbox(
        &self,
        entity_type: EntityType,
        bbox: &BoundingBox,
    ) -> Result<Vec<EntitySummary>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM locations
                     WHERE entity_type = ?1
                       AND lat BETWEEN ?2 AND ?3
                       AND lng BETWEEN ?4 AND ?5"
                ),
                libsql::params![
                    entity_type.as_str(),
                    bbox.min_lat,
                    bbox.max_lat,
                    bbox.min_lng,
                    bbox.max_lng
                ],
            )
            .await?;
        let mut found = Vec::new();
        while let Some(row) = rows.next().await? {
            let location = row_to_location(&row)?;
            if let Some(coordinates) = location.coordinates {
                found.push(EntitySummary {
                    id: location.id,
                    entity_type: location.entity_type,
                    coordinates,
                    display_name: location.display_name,
                });
            }
        }
        Ok(found)
    }

    /// Record an accepted external id, replacing any previous one for the provider.
    pub async fn attach_location_external_id(
        &self,
        entity: EntityRef,
        provider: ProviderId,
        external_id: &str,
        metadata: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "INSERT INTO location_external_ids
                    (entity_id, entity_type, provider, external_id, metadata, attached_at)
                 SELECT ?1, ?2, ?3, ?4, ?5, ?6
                 WHERE EXISTS (SELECT 1 FROM locations WHERE id = ?1 AND entity_type = ?2)
                 ON CONFLICT(entity_type, entity_id, provider) DO UPDATE SET
                    external_id = excluded.external_id,
                    metadata = excluded.metadata,
                    attached_at = excluded.attached_at",
                libsql::params![
                    entity.id,
                    entity.entity_type.as_str(),
                    provider.as_str(),
                    external_id,
                    to_json(metadata)?,
                    fmt_ts(now)
                ],
            )
            .await?;
        if affected == 0 {
            return Err(DatabaseError::NoResult);
        }
        Ok(())
    }
}

fn not_found(entity_type: EntityType, id: i64) -> CoreError {
    CoreError::NotFound {
        entity_type: entity_type.to_string(),
        id: id.to_string(),
    }
}

#[async_trait]
impl EntityStore for ProxDb {
    async fn get_entity(
        &self,
        id: i64,
        entity_type: EntityType,
    ) -> Result<LocationEntity, CoreError> {
        self.get_location(EntityRef::new(id, entity_type))
            .await?
            .ok_or_else(|| not_found(entity_type, id))
    }

    async fn query_entities_in_radius(
        &self,
        center: Coordinates,
        radius_m: f64,
        entity_type: EntityType,
    ) -> Result<Vec<EntitySummary>, CoreError> {
        let bbox = BoundingBox::around(&center, radius_m);
        let mut found = self.locations_in_bbox(entity_type, &bbox).await?;
        found.retain(|e| center.distance_m(&e.coordinates) <= radius_m);
        Ok(found)
    }

    async fn attach_external_id(
        &self,
        entity_id: i64,
        entity_type: EntityType,
        provider: ProviderId,
        external_id: &str,
        metadata: serde_json::Value,
    ) -> Result<(), CoreError> {
        match self
            .attach_location_external_id(
                EntityRef::new(entity_id, entity_type),
                provider,
                external_id,
                &metadata,
                Utc::now(),
            )
            .await
        {
            Err(DatabaseError::NoResult) => Err(not_found(entity_type, entity_id)),
            other => Ok(other?),
        }
    }
}
