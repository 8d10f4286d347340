//! Integration tests for TOML configuration loading.
//!
//! Uses `figment::Jail` for sandboxed files and env vars.

use figment::{
    Figment, Jail,
    providers::{Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;
use prox_config::{ConfigError, ProximaConfig};
use prox_core::enums::EntityType;

fn load(jail_file: &str) -> figment::error::Result<ProximaConfig> {
    Figment::from(Serialized::defaults(ProximaConfig::default()))
        .merge(Toml::file(jail_file))
        .extract()
}

#[test]
fn loads_queue_and_nearby_sections() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[queue]
max_attempts = 3
batch_size = 10

[nearby]
radius_profile = "dense"
top_k = 5

[nearby.radii]
charger = 1500.0
poi = 400.0
"#,
        )?;

        let config = load("config.toml")?;
        assert_eq!(config.queue.max_attempts, 3);
        assert_eq!(config.queue.batch_size, 10);
        assert_eq!(config.queue.backoff_base_secs, 30);
        assert_eq!(config.nearby.radius_profile, "dense");
        assert_eq!(config.nearby.top_k, 5);
        assert_eq!(
            config.nearby.target_types().collect::<Vec<_>>(),
            vec![EntityType::Charger, EntityType::Poi]
        );
        assert!(config.validate().is_ok());
        Ok(())
    });
}

#[test]
fn loads_discovery_weights_and_bbox() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[discovery]
accept_threshold = 80.0
hard_distance_cap_m = 150.0

[discovery.weights]
distance = 0.6
name = 0.3
type = 0.1

[discovery.domestic_bbox]
min_lat = 47.7
min_lng = 16.8
max_lat = 49.6
max_lng = 22.6
"#,
        )?;

        let config = load("config.toml")?;
        assert!((config.discovery.weights.distance - 0.6).abs() < f64::EPSILON);
        assert!((config.discovery.weights.category - 0.1).abs() < f64::EPSILON);
        assert!((config.discovery.accept_threshold - 80.0).abs() < f64::EPSILON);
        assert!((config.discovery.domestic_bbox.min_lat - 47.7).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
        Ok(())
    });
}

#[test]
fn loads_provider_endpoints() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[providers]
timeout_secs = 4

[providers.google]
api_key = "g-key"

[providers.isochrone]
api_key = "ors-key"
profile = "cycling-regular"
ranges = [600, 1200]
"#,
        )?;

        let config = load("config.toml")?;
        assert_eq!(config.providers.timeout_secs, 4);
        assert!(config.providers.google.is_configured());
        assert_eq!(config.providers.google.base_url, "https://maps.googleapis.com");
        assert!(!config.providers.mapy.is_configured());
        assert_eq!(config.providers.isochrone.ranges, vec![600, 1200]);
        assert!(config.providers.isochrone.is_configured());
        Ok(())
    });
}

#[test]
fn weights_that_do_not_sum_to_one_fail_validation() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r"
[discovery.weights]
distance = 0.9
name = 0.5
type = 0.1
",
        )?;

        let config = load("config.toml")?;
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "discovery.weights"),
            "got {err:?}"
        );
        Ok(())
    });
}

#[test]
fn lock_shorter_than_budget_fails_validation() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r"
[on_demand]
time_budget_ms = 10000
lock_ttl_secs = 5
",
        )?;

        let config = load("config.toml")?;
        assert!(config.validate().is_err());
        Ok(())
    });
}
