use anyhow::Context;
use prox_config::ProximaConfig;

/// Load `.env`, the TOML layers, and `PROXIMA_*` overrides, then validate.
pub fn load_config() -> anyhow::Result<ProximaConfig> {
    let config = ProximaConfig::load_with_dotenv().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}
