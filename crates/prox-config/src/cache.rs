//! Cache time-to-live policy.
//!
//! TTLs follow volatility: nearby lists change whenever an entity is edited,
//! isochrones only when the road network or walking speed changes, and
//! geocoded addresses almost never.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_nearby_ttl_secs() -> u64 {
    15 * 60
}

const fn default_isochrone_ttl_secs() -> u64 {
    6 * 60 * 60
}

const fn default_geocode_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

const fn default_purge_grace_secs() -> u64 {
    24 * 60 * 60
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_nearby_ttl_secs")]
    pub nearby_ttl_secs: u64,

    #[serde(default = "default_isochrone_ttl_secs")]
    pub isochrone_ttl_secs: u64,

    #[serde(default = "default_geocode_ttl_secs")]
    pub geocode_ttl_secs: u64,

    /// Expired rows are kept this long for stale-while-revalidate, then purged.
    #[serde(default = "default_purge_grace_secs")]
    pub purge_grace_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            nearby_ttl_secs: default_nearby_ttl_secs(),
            isochrone_ttl_secs: default_isochrone_ttl_secs(),
            geocode_ttl_secs: default_geocode_ttl_secs(),
            purge_grace_secs: default_purge_grace_secs(),
        }
    }
}

impl CacheConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.nearby_ttl_secs == 0 {
            return Err(ConfigError::invalid("cache.nearby_ttl_secs", "must be positive"));
        }
        if self.isochrone_ttl_secs < self.nearby_ttl_secs {
            return Err(ConfigError::invalid(
                "cache.isochrone_ttl_secs",
                "isochrones must live at least as long as nearby lists",
            ));
        }
        Ok(())
    }
}
