//! Serde and JSON Schema checks for the types that cross crate and process
//! boundaries (cache values, review rows, on-demand responses).

use std::collections::BTreeMap;

use chrono::Utc;
use pretty_assertions::assert_eq;
use schemars::schema_for;

use prox_core::entities::*;
use prox_core::enums::*;
use prox_core::geo::Coordinates;
use prox_core::responses::*;

fn prague() -> Coordinates {
    Coordinates::new(50.075, 14.438).unwrap()
}

fn schema_properties<T: schemars::JsonSchema>() -> Vec<String> {
    let schema = serde_json::to_value(schema_for!(T)).unwrap();
    let mut keys: Vec<String> = schema["properties"]
        .as_object()
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default();
    keys.sort();
    keys
}

#[test]
fn nearby_set_roundtrips_in_order() {
    let set = NearbySet {
        origin_id: 1,
        origin_type: EntityType::Charger,
        candidate_type: EntityType::Poi,
        radius_profile: "default".into(),
        radius_m: 1_000.0,
        matches: vec![
            NearbyMatch {
                candidate_id: 11,
                distance_m: 300.0,
            },
            NearbyMatch {
                candidate_id: 12,
                distance_m: 900.0,
            },
        ],
    };
    let json = serde_json::to_string(&set).unwrap();
    let back: NearbySet = serde_json::from_str(&json).unwrap();
    assert_eq!(back, set);
}

#[test]
fn location_entity_serializes_external_ids_by_provider_name() {
    let mut external_ids = BTreeMap::new();
    external_ids.insert(ProviderId::Mapy, "poi:123".to_string());
    let entity = LocationEntity {
        id: 5,
        entity_type: EntityType::Poi,
        coordinates: Some(prague()),
        display_name: "Kavárna Dobra Chut".into(),
        external_ids,
    };
    let value = serde_json::to_value(&entity).unwrap();
    assert_eq!(value["external_ids"]["mapy"], "poi:123");
    let back: LocationEntity = serde_json::from_value(value).unwrap();
    assert_eq!(back, entity);
}

#[test]
fn review_item_embeds_candidate() {
    let mut candidate =
        DiscoveryCandidate::new(ProviderId::Google, "ChIJ1", "Cafe", prague(), vec![]);
    candidate.match_reasons = vec!["distance 350m > cap".into()];
    let item = ReviewQueueItem {
        id: 1,
        entity_id: 9,
        entity_type: EntityType::Poi,
        candidate,
        distance_m: 350.0,
        status: ReviewStatus::Pending,
        created_at: Utc::now(),
        resolved_at: None,
    };
    let json = serde_json::to_string(&item).unwrap();
    let back: ReviewQueueItem = serde_json::from_str(&json).unwrap();
    assert_eq!(back, item);
}

#[test]
fn queue_stats_schema_lists_all_counters() {
    assert_eq!(
        schema_properties::<QueueStats>(),
        vec![
            "done",
            "failed",
            "oldest_pending_age_secs",
            "pending",
            "processing"
        ]
    );
}

#[test]
fn discovery_report_schema_has_decision_lists() {
    let props = schema_properties::<DiscoveryReport>();
    for key in ["accepted", "queued_for_review", "provider_failures", "skipped"] {
        assert!(props.contains(&key.to_string()), "missing {key}: {props:?}");
    }
}
