//! Nearby reverse index: which origins list a given candidate.

use prox_core::entities::EntityRef;
use prox_core::enums::EntityType;

use crate::ProxDb;
use crate::error::DatabaseError;
use crate::helpers::parse_enum;

impl ProxDb {
    /// Replace the refs of one `(origin, candidate_type)` nearby set.
    ///
    /// New refs are inserted before stale ones are dropped, so a concurrent
    /// reader always sees a superset of either the old or the new set.
    pub async fn replace_nearby_refs(
        &self,
        origin: EntityRef,
        candidate_type: EntityType,
        candidate_ids: &[i64],
    ) -> Result<(), DatabaseError> {
        for candidate_id in candidate_ids {
            self.conn()
                .execute(
                    "INSERT OR IGNORE INTO nearby_refs
                        (origin_id, origin_type, candidate_id, candidate_type)
                     VALUES (?1, ?2, ?3, ?4)",
                    libsql::params![
                        origin.id,
                        origin.entity_type.as_str(),
                        *candidate_id,
                        candidate_type.as_str()
                    ],
                )
                .await?;
        }

        // Ids are integers, so inlining them is safe.
        let keep = candidate_ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        self.conn()
            .execute(
                &format!(
                    "DELETE FROM nearby_refs
                     WHERE origin_id = ?1 AND origin_type = ?2 AND candidate_type = ?3
                       AND candidate_id NOT IN ({keep})"
                ),
                libsql::params![
                    origin.id,
                    origin.entity_type.as_str(),
                    candidate_type.as_str()
                ],
            )
            .await?;
        Ok(())
    }

    /// Origins whose last computed nearby set includes `candidate`.
    pub async fn origins_referencing(
        &self,
        candidate: EntityRef,
    ) -> Result<Vec<EntityRef>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT DISTINCT origin_id, origin_type FROM nearby_refs
                 WHERE candidate_id = ?1 AND candidate_type = ?2
                 ORDER BY origin_type, origin_id",
                libsql::params![candidate.id, candidate.entity_type.as_str()],
            )
            .await?;
        let mut origins = Vec::new();
        while let Some(row) = rows.next().await? {
            origins.push(EntityRef::new(
                row.get(0)?,
                parse_enum(&row.get::<String>(1)?)?,
            ));
        }
        Ok(origins)
    }

    /// Drop every ref held by `origin` (its nearby sets no longer exist).
    pub async fn remove_nearby_refs_for_origin(
        &self,
        origin: EntityRef,
    ) -> Result<u64, DatabaseError> {
        Ok(self
            .conn()
            .execute(
                "DELETE FROM nearby_refs WHERE origin_id = ?1 AND origin_type = ?2",
                libsql::params![origin.id, origin.entity_type.as_str()],
            )
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn replace_refs_tracks_latest_set() {
        let db = ProxDb::open_local(":memory:").await.unwrap();
        let origin = EntityRef::new(1, EntityType::Poi);

        db.replace_nearby_refs(origin, EntityType::Charger, &[10, 11])
            .await
            .unwrap();
        db.replace_nearby_refs(origin, EntityType::Charger, &[11, 12])
            .await
            .unwrap();

        let c10 = db
            .origins_referencing(EntityRef::new(10, EntityType::Charger))
            .await
            .unwrap();
        assert!(c10.is_empty());
        let c12 = db
            .origins_referencing(EntityRef::new(12, EntityType::Charger))
            .await
            .unwrap();
        assert_eq!(c12, vec![origin]);
    }

    #[tokio::test]
    async fn empty_set_clears_refs() {
        let db = ProxDb::open_local(":memory:").await.unwrap();
        let origin = EntityRef::new(1, EntityType::Poi);
        db.replace_nearby_refs(origin, EntityType::Poi, &[2]).await.unwrap();
        db.replace_nearby_refs(origin, EntityType::Poi, &[]).await.unwrap();
        assert!(
            db.origins_referencing(EntityRef::new(2, EntityType::Poi))
                .await
                .unwrap()
                .is_empty()
        );
    }
}
