//! External provider endpoints and credentials.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("proxima/{}", env!("CARGO_PKG_VERSION"))
}

fn default_mapy_base_url() -> String {
    "https://api.mapy.cz".to_string()
}

fn default_google_base_url() -> String {
    "https://maps.googleapis.com".to_string()
}

fn default_nominatim_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_ors_base_url() -> String {
    "https://api.openrouteservice.org".to_string()
}

fn default_isochrone_profile() -> String {
    "foot-walking".to_string()
}

fn default_isochrone_ranges() -> Vec<u32> {
    vec![300, 600, 900]
}

/// A keyed HTTP provider.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KeyedEndpoint {
    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub base_url: String,
}

impl KeyedEndpoint {
    fn with_base(base_url: String) -> Self {
        Self {
            api_key: String::new(),
            base_url,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.base_url.trim().is_empty()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NominatimConfig {
    #[serde(default = "default_nominatim_base_url")]
    pub base_url: String,

    /// Nominatim works without a key; setting this to false removes it from discovery.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: default_nominatim_base_url(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IsochroneProviderConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_ors_base_url")]
    pub base_url: String,

    #[serde(default = "default_isochrone_profile")]
    pub profile: String,

    /// Travel-time ranges in seconds.
    #[serde(default = "default_isochrone_ranges")]
    pub ranges: Vec<u32>,
}

impl Default for IsochroneProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_ors_base_url(),
            profile: default_isochrone_profile(),
            ranges: default_isochrone_ranges(),
        }
    }
}

impl IsochroneProviderConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "mapy_default")]
    pub mapy: KeyedEndpoint,

    #[serde(default = "google_default")]
    pub google: KeyedEndpoint,

    #[serde(default)]
    pub nominatim: NominatimConfig,

    #[serde(default)]
    pub isochrone: IsochroneProviderConfig,
}

fn mapy_default() -> KeyedEndpoint {
    KeyedEndpoint::with_base(default_mapy_base_url())
}

fn google_default() -> KeyedEndpoint {
    KeyedEndpoint::with_base(default_google_base_url())
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            mapy: mapy_default(),
            google: google_default(),
            nominatim: NominatimConfig::default(),
            isochrone: IsochroneProviderConfig::default(),
        }
    }
}

impl ProvidersConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("providers.timeout_secs", "must be positive"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::invalid(
                "providers.user_agent",
                "Nominatim rejects requests without a user agent",
            ));
        }
        if self.isochrone.ranges.is_empty() || self.isochrone.ranges.contains(&0) {
            return Err(ConfigError::invalid(
                "providers.isochrone.ranges",
                "need at least one positive range",
            ));
        }
        Ok(())
    }
}
