//! Batch drains, the circuit breaker, the scheduler sweep, and geocoding.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use tokio::sync::watch;

use common::{FakePlaces, MemoryStore, memory_db, origin_point, pipeline, test_config};
use prox_core::entities::{EntityRef, NewTask};
use prox_core::enums::{EntityType, ProviderId, TaskKind, TaskStatus};
use prox_db::repos::TaskFilter;
use prox_pipeline::cache_policy::keys;
use prox_providers::Providers;

fn store_with_pois(count: u8) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::default());
    for n in 1..=count {
        let at = origin_point().offset_m(f64::from(n) * 100.0, 0.0).unwrap();
        store.insert(i64::from(n), EntityType::Poi, &format!("Poi {n}"), Some(at));
    }
    store
}

#[tokio::test]
async fn identical_failures_trip_the_breaker_and_release_the_rest() {
    let mut config = test_config();
    config.queue.breaker_threshold = 3;
    let db = memory_db().await;
    let pipeline = pipeline(&config, &db, store_with_pois(5), Providers::default());

    for id in 1..=5 {
        let task = NewTask::nearby(id, EntityType::Poi, 0).with_kind(TaskKind::Isochrone);
        pipeline.queue.enqueue_task(&task).await.unwrap();
    }

    let report = pipeline.batch.process_batch(10).await.unwrap();
    assert!(report.tripped);
    assert_eq!(report.processed, 3);
    assert_eq!(report.failed, 3);
    assert_eq!(report.released, 2);
    assert!(report.message.contains("no isochrone provider configured"), "{}", report.message);

    // Configuration errors are not retried; released tasks keep their attempts.
    let stats = pipeline.queue.stats().await.unwrap();
    assert_eq!(stats.failed, 3);
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.processing, 0);

    assert_eq!(
        pipeline
            .queue
            .requeue_failed(Some(TaskKind::Isochrone))
            .await
            .unwrap(),
        3
    );
    assert_eq!(pipeline.queue.stats().await.unwrap().pending, 5);
}

#[tokio::test]
async fn mixed_failures_do_not_trip_the_breaker() {
    let mut config = test_config();
    config.queue.breaker_threshold = 2;
    let db = memory_db().await;
    let store = store_with_pois(2);
    store.insert(3, EntityType::Poi, "Unplaced", None);
    let pipeline = pipeline(&config, &db, store, Providers::default());

    pipeline.queue.enqueue(1, EntityType::Poi, 0).await.unwrap();
    pipeline.queue.enqueue(3, EntityType::Poi, 0).await.unwrap();
    pipeline
        .queue
        .enqueue_task(&NewTask::nearby(2, EntityType::Poi, 0).with_kind(TaskKind::Isochrone))
        .await
        .unwrap();

    let report = pipeline.batch.process_batch(10).await.unwrap();
    assert!(!report.tripped);
    assert_eq!(report.processed, 3);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 2);
    assert_eq!(report.released, 0);
}

#[tokio::test]
async fn locked_origin_postpones_the_task_without_an_attempt() {
    let db = memory_db().await;
    let pipeline = pipeline(&test_config(), &db, store_with_pois(2), Providers::default());
    let busy = EntityRef::new(1, EntityType::Poi);
    db.try_acquire_lock(
        &keys::nearby_lock(busy),
        "another-worker",
        chrono::Duration::seconds(60),
        Utc::now(),
    )
    .await
    .unwrap();
    pipeline.queue.enqueue(1, EntityType::Poi, 0).await.unwrap();
    pipeline.queue.enqueue(2, EntityType::Poi, 0).await.unwrap();

    let report = pipeline.batch.process_batch(10).await.unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.postponed, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);
    assert!(!report.tripped);

    let pending = db
        .list_tasks(&TaskFilter {
            status: Some(TaskStatus::Pending),
            kind: Some(TaskKind::Nearby),
            limit: None,
        })
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].entity_id, 1);
    assert_eq!(pending[0].attempts, 0);
    assert!(pending[0].available_at > Utc::now());

    // Not due yet.
    assert_eq!(pipeline.batch.process_batch(10).await.unwrap().processed, 0);
}

#[tokio::test]
async fn sweep_drains_the_queue_in_batches() {
    let mut config = test_config();
    config.queue.batch_size = 2;
    let db = memory_db().await;
    let pipeline = pipeline(&config, &db, store_with_pois(3), Providers::default());
    for id in 1..=3 {
        pipeline.queue.enqueue(id, EntityType::Poi, 0).await.unwrap();
    }

    let report = pipeline.scheduler().sweep().await.unwrap();
    assert_eq!(report.batches, 2);
    assert_eq!(report.processed, 3);
    assert_eq!(report.failed, 0);
    assert!(!report.tripped);

    let stats = pipeline.queue.stats().await.unwrap();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.done, 3);
}

#[tokio::test]
async fn scheduler_runs_until_shutdown() {
    let db = memory_db().await;
    let pipeline = pipeline(&test_config(), &db, store_with_pois(2), Providers::default());
    let scheduler = pipeline.scheduler();
    let trigger = scheduler.trigger();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    pipeline.queue.enqueue(1, EntityType::Poi, 0).await.unwrap();
    pipeline.queue.enqueue(2, EntityType::Poi, 0).await.unwrap();
    trigger.notify();

    let mut drained = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if pipeline.queue.stats().await.unwrap().done == 2 {
            drained = true;
            break;
        }
    }
    assert!(drained, "triggered sweep drains the queue");

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("scheduler stops on shutdown")
        .unwrap();
}

#[tokio::test]
async fn geocoding_is_cached_per_normalized_query() {
    let db = memory_db().await;
    let mapy = FakePlaces::answering(ProviderId::Mapy, vec![]);
    let providers = Providers {
        domestic: vec![mapy.clone()],
        ..Providers::default()
    };
    let pipeline = pipeline(&test_config(), &db, store_with_pois(0), providers);

    let first = pipeline
        .geocoder
        .geocode(None, "Vinohradská 1, Praha", 5)
        .await
        .unwrap();
    let second = pipeline
        .geocoder
        .geocode(Some(ProviderId::Mapy), "  vinohradská 1,   PRAHA ", 5)
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(mapy.calls(), 1);

    let at = origin_point();
    let reverse = pipeline.geocoder.reverse(None, at).await.unwrap().unwrap();
    assert_eq!(reverse.label, "Vinohradská 1");
    pipeline.geocoder.reverse(None, at).await.unwrap();
    assert_eq!(mapy.calls(), 2);
}

#[tokio::test]
async fn geocoding_rejects_empty_queries_and_unknown_providers() {
    let db = memory_db().await;
    let providers = Providers {
        domestic: vec![FakePlaces::answering(ProviderId::Mapy, vec![])],
        ..Providers::default()
    };
    let pipeline = pipeline(&test_config(), &db, store_with_pois(0), providers);

    let err = pipeline.geocoder.geocode(None, "   ", 5).await.unwrap_err();
    assert_eq!(err.kind(), "input");
    let err = pipeline
        .geocoder
        .geocode(Some(ProviderId::Google), "Praha", 5)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "config");
}
