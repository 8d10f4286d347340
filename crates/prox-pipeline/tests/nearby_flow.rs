//! Nearby sets end to end: mutation → enqueue → batch → cache.
//!
//! Uses the SQL entity store so the reverse index and the radius queries run
//! against the same database the queue lives in.

mod common;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use pretty_assertions::assert_eq;

use common::{memory_db, origin_point, pipeline, test_config};
use prox_config::ProximaConfig;
use prox_core::entities::{EntityRef, NearbySet};
use prox_core::enums::{EntityType, TaskKind, TaskStatus};
use prox_core::geo::Coordinates;
use prox_core::responses::Outcome;
use prox_db::ProxDb;
use prox_db::repos::TaskFilter;
use prox_pipeline::Pipeline;
use prox_pipeline::cache_policy::{Lookup, keys};
use prox_providers::Providers;

fn chargers_within(radius_m: f64) -> ProximaConfig {
    let mut config = test_config();
    config.nearby.radii = BTreeMap::from([(EntityType::Charger, radius_m)]);
    config
}

fn pois_within(radius_m: f64) -> ProximaConfig {
    let mut config = test_config();
    config.nearby.radii = BTreeMap::from([(EntityType::Poi, radius_m)]);
    config
}

async fn setup(config: &ProximaConfig) -> (Arc<ProxDb>, Pipeline) {
    let db = memory_db().await;
    let store = Arc::clone(&db) as Arc<dyn prox_core::store::EntityStore>;
    let pipeline = pipeline(config, &db, store, Providers::default());
    (db, pipeline)
}

async fn put(db: &ProxDb, entity: EntityRef, at: Option<Coordinates>) {
    db.upsert_location(entity, at, &format!("{} {}", entity.entity_type, entity.id), Utc::now())
        .await
        .unwrap();
}

async fn drain(pipeline: &Pipeline) {
    loop {
        let report = pipeline.batch.process_batch(50).await.unwrap();
        if report.processed == 0 {
            break;
        }
    }
}

async fn pending_nearby(db: &ProxDb) -> BTreeSet<i64> {
    db.list_tasks(&TaskFilter {
        status: Some(TaskStatus::Pending),
        kind: Some(TaskKind::Nearby),
        limit: None,
    })
    .await
    .unwrap()
    .into_iter()
    .map(|t| t.entity_id)
    .collect()
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chargers_at_300_and_900_metres_are_cached_in_order() {
    let config = chargers_within(1_000.0);
    let (db, pipeline) = setup(&config).await;

    let e = EntityRef::new(1, EntityType::Poi);
    put(&db, e, Some(origin_point())).await;
    put(&db, EntityRef::new(11, EntityType::Charger), origin_point().offset_m(300.0, 0.0)).await;
    put(&db, EntityRef::new(12, EntityType::Charger), origin_point().offset_m(0.0, 900.0)).await;
    put(&db, EntityRef::new(13, EntityType::Charger), origin_point().offset_m(1_100.0, 0.0)).await;

    assert!(pipeline.queue.enqueue(e.id, e.entity_type, 0).await.unwrap());
    drain(&pipeline).await;

    let key = keys::nearby(e, EntityType::Charger, "default");
    let Lookup::Fresh(set) = pipeline.cache.get::<NearbySet>(&key, Utc::now()).await.unwrap() else {
        panic!("expected a fresh nearby set");
    };
    let ids: Vec<i64> = set.matches.iter().map(|m| m.candidate_id).collect();
    assert_eq!(ids, vec![11, 12]);
    assert!((set.matches[0].distance_m - 300.0).abs() < 0.05);
    assert!((set.matches[1].distance_m - 900.0).abs() < 0.05);
    assert_eq!(set.radius_m, 1_000.0);

    let stats = pipeline.queue.stats().await.unwrap();
    assert_eq!(stats.done, 1);
    assert_eq!(stats.pending, 0);
}

#[tokio::test]
async fn recomputation_is_idempotent() {
    let config = chargers_within(1_000.0);
    let (db, pipeline) = setup(&config).await;
    let e = EntityRef::new(1, EntityType::Poi);
    put(&db, e, Some(origin_point())).await;
    put(&db, EntityRef::new(11, EntityType::Charger), origin_point().offset_m(300.0, 0.0)).await;

    let first = pipeline.nearby.compute(e).await.unwrap();
    let second = pipeline.nearby.compute(e).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn top_k_truncates_to_the_closest() {
    let mut config = chargers_within(2_000.0);
    config.nearby.top_k = 2;
    let (db, pipeline) = setup(&config).await;
    let e = EntityRef::new(1, EntityType::Poi);
    put(&db, e, Some(origin_point())).await;
    for (id, d) in [(21, 700.0), (22, 100.0), (23, 400.0)] {
        put(&db, EntityRef::new(id, EntityType::Charger), origin_point().offset_m(d, 0.0)).await;
    }

    let sets = pipeline.nearby.compute(e).await.unwrap();
    let ids: Vec<i64> = sets[0].matches.iter().map(|m| m.candidate_id).collect();
    assert_eq!(ids, vec![22, 23]);
}

#[tokio::test]
async fn origin_is_not_its_own_neighbour() {
    let config = pois_within(1_000.0);
    let (db, pipeline) = setup(&config).await;
    let e = EntityRef::new(1, EntityType::Poi);
    put(&db, e, Some(origin_point())).await;
    put(&db, EntityRef::new(2, EntityType::Poi), origin_point().offset_m(50.0, 0.0)).await;

    let sets = pipeline.nearby.compute(e).await.unwrap();
    let ids: Vec<i64> = sets[0].matches.iter().map(|m| m.candidate_id).collect();
    assert_eq!(ids, vec![2]);
}

#[tokio::test]
async fn missing_coordinates_fail_the_task_permanently() {
    let config = chargers_within(1_000.0);
    let (db, pipeline) = setup(&config).await;
    let e = EntityRef::new(5, EntityType::CampSpot);
    put(&db, e, None).await;

    pipeline.queue.enqueue(e.id, e.entity_type, 0).await.unwrap();
    let report = pipeline.batch.process_batch(10).await.unwrap();
    assert_eq!(report.failed, 1);

    let stats = pipeline.queue.stats().await.unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.pending, 0);
}

// ---------------------------------------------------------------------------
// Freshness
// ---------------------------------------------------------------------------

#[tokio::test]
async fn expired_entries_are_never_served_as_ready() {
    let mut config = chargers_within(1_000.0);
    config.cache.nearby_ttl_secs = 0;
    let (db, pipeline) = setup(&config).await;
    let e = EntityRef::new(1, EntityType::Poi);
    put(&db, e, Some(origin_point())).await;
    put(&db, EntityRef::new(11, EntityType::Charger), origin_point().offset_m(300.0, 0.0)).await;

    pipeline.nearby.compute(e).await.unwrap();
    let lookup = pipeline
        .nearby
        .cached(e, &[EntityType::Charger])
        .await
        .unwrap();
    assert!(matches!(lookup, Lookup::Stale(_)));

    // A fresh answer from on-demand must come from a recompute, which
    // with a zero TTL is immediately stale again.
    let outcome = pipeline.on_demand.nearby(e, None, None).await.unwrap();
    let Outcome::Ready { data } = outcome else {
        panic!("expected an in-budget recompute");
    };
    assert_eq!(data[0].matches[0].candidate_id, 11);
}

// ---------------------------------------------------------------------------
// Affected set
// ---------------------------------------------------------------------------

/// 3×3 grid of POIs 400 m apart, ids 1..=9 row by row from the origin point.
async fn grid(db: &ProxDb) -> BTreeMap<i64, Coordinates> {
    let mut points = BTreeMap::new();
    for row in 0..3_u8 {
        for col in 0..3_u8 {
            let id = i64::from(row * 3 + col + 1);
            let at = origin_point()
                .offset_m(f64::from(row) * 400.0, f64::from(col) * 400.0)
                .unwrap();
            put(db, EntityRef::new(id, EntityType::Poi), Some(at)).await;
            points.insert(id, at);
        }
    }
    points
}

#[tokio::test]
async fn affected_set_covers_old_and_new_neighbourhoods() {
    let config = pois_within(1_000.0);
    let (db, pipeline) = setup(&config).await;
    let points = grid(&db).await;
    for id in points.keys() {
        pipeline.queue.enqueue(*id, EntityType::Poi, 0).await.unwrap();
    }
    drain(&pipeline).await;

    // Move the corner entity 10 km away.
    let moved = EntityRef::new(1, EntityType::Poi);
    let old = points[&1];
    put(&db, moved, origin_point().offset_m(-10_000.0, 0.0)).await;

    let created = pipeline.queue.enqueue_affected(moved.id, moved.entity_type).await.unwrap();

    // Brute force: every origin that listed the entity at its old position, plus itself.
    let mut expected: BTreeSet<i64> = points
        .iter()
        .filter(|(id, at)| **id != 1 && old.distance_m(at) <= 1_000.0)
        .map(|(id, _)| *id)
        .collect();
    expected.insert(1);
    assert_eq!(pending_nearby(&db).await, expected);
    assert_eq!(created, expected.len());
    assert!(!expected.contains(&9), "the far corner never listed entity 1");

    // Affected entries are kept as stale fallbacks.
    let lookup = pipeline
        .nearby
        .cached(EntityRef::new(2, EntityType::Poi), &[EntityType::Poi])
        .await
        .unwrap();
    assert!(matches!(lookup, Lookup::Stale(_)));

    // After recompute nobody lists the moved entity.
    drain(&pipeline).await;
    assert!(db.origins_referencing(moved).await.unwrap().is_empty());
}

#[tokio::test]
async fn new_entity_in_the_middle_affects_its_surroundings() {
    let config = pois_within(1_000.0);
    let (db, pipeline) = setup(&config).await;
    let points = grid(&db).await;
    for id in points.keys() {
        pipeline.queue.enqueue(*id, EntityType::Poi, 0).await.unwrap();
    }
    drain(&pipeline).await;

    let added = EntityRef::new(100, EntityType::Poi);
    put(&db, added, Some(points[&5])).await;
    pipeline.queue.enqueue_affected(added.id, added.entity_type).await.unwrap();

    let mut expected: BTreeSet<i64> = points.keys().copied().collect();
    expected.insert(100);
    assert_eq!(pending_nearby(&db).await, expected);

    drain(&pipeline).await;
    let origins: BTreeSet<i64> = db
        .origins_referencing(added)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();
    // Corners are 566 m from the centre, so every grid point lists it.
    assert_eq!(origins, points.keys().copied().collect());
}

#[tokio::test]
async fn removed_entity_drops_its_own_sets() {
    let config = pois_within(1_000.0);
    let (db, pipeline) = setup(&config).await;
    let points = grid(&db).await;
    for id in points.keys() {
        pipeline.queue.enqueue(*id, EntityType::Poi, 0).await.unwrap();
    }
    drain(&pipeline).await;

    let removed = EntityRef::new(5, EntityType::Poi);
    db.remove_location(removed).await.unwrap();
    pipeline.queue.enqueue_affected(removed.id, removed.entity_type).await.unwrap();

    let pending = pending_nearby(&db).await;
    assert!(!pending.contains(&5));
    assert_eq!(pending.len(), 8);
    assert!(
        pipeline
            .cache
            .get::<NearbySet>(&keys::nearby(removed, EntityType::Poi, "default"), Utc::now())
            .await
            .unwrap()
            == Lookup::Missing
    );

    drain(&pipeline).await;
    assert!(db.origins_referencing(removed).await.unwrap().is_empty());
}
