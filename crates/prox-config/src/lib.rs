//! # prox-config
//!
//! Layered configuration loading for Proxima using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`PROXIMA_*` prefix, `__` as separator)
//! 2. Project-level `.proxima/config.toml`
//! 3. User-level `~/.config/proxima/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `PROXIMA_PROVIDERS__MAPY__API_KEY` -> `providers.mapy.api_key`,
//! `PROXIMA_NEARBY__RADII__POI` -> `nearby.radii.poi`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use prox_config::ProximaConfig;
//!
//! let config = ProximaConfig::load_with_dotenv().expect("config");
//! config.validate().expect("valid config");
//!
//! if config.providers.mapy.is_configured() {
//!     println!("Mapy.cz at {}", config.providers.mapy.base_url);
//! }
//! ```

mod cache;
mod database;
mod discovery;
mod error;
mod nearby;
mod on_demand;
mod providers;
mod queue;

pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use discovery::{DiscoveryConfig, ScoreWeights};
pub use error::ConfigError;
pub use nearby::NearbyConfig;
pub use on_demand::OnDemandConfig;
pub use providers::{IsochroneProviderConfig, KeyedEndpoint, NominatimConfig, ProvidersConfig};
pub use queue::QueueConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProximaConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub nearby: NearbyConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub on_demand: OnDemandConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl ProximaConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration with `.env` file support.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = PathBuf::from(".proxima/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("PROXIMA_").split("__"))
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.queue.validate()?;
        self.nearby.validate()?;
        self.cache.validate()?;
        self.on_demand.validate()?;
        self.discovery.validate()?;
        self.providers.validate()?;
        Ok(())
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("proxima").join("config.toml"))
    }

    /// Load `.env` from the workspace root, falling back to the current directory.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}
