use prox_config::ProximaConfig;

/// Emit warnings for configuration that silently disables part of the pipeline.
pub fn warn_unconfigured(config: &ProximaConfig) {
    for warning in collect_unconfigured_warnings(config, std::env::vars()) {
        tracing::warn!("{warning}");
    }
}

fn collect_unconfigured_warnings<I>(config: &ProximaConfig, env: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let env_keys = env.into_iter().map(|(key, _)| key).collect::<Vec<_>>();
    let providers = &config.providers;

    let mut warnings = Vec::new();

    if !providers.mapy.is_configured() && has_env_prefix(&env_keys, "PROXIMA_PROVIDERS_MAPY") {
        warnings.push(
            "Mapy.cz config appears default while PROXIMA_PROVIDERS_MAPY* env vars exist. Use double underscores (example: PROXIMA_PROVIDERS__MAPY__API_KEY)."
                .to_string(),
        );
    }

    if !providers.google.is_configured() && has_env_prefix(&env_keys, "PROXIMA_PROVIDERS_GOOGLE")
    {
        warnings.push(
            "Google Places config appears default while PROXIMA_PROVIDERS_GOOGLE* env vars exist. Use double underscores (example: PROXIMA_PROVIDERS__GOOGLE__API_KEY)."
                .to_string(),
        );
    }

    if !providers.isochrone.is_configured()
        && has_env_prefix(&env_keys, "PROXIMA_PROVIDERS_ISOCHRONE")
    {
        warnings.push(
            "Isochrone config appears default while PROXIMA_PROVIDERS_ISOCHRONE* env vars exist. Use double underscores (example: PROXIMA_PROVIDERS__ISOCHRONE__API_KEY)."
                .to_string(),
        );
    }

    if !config.on_demand.tokens_enabled() && has_env_prefix(&env_keys, "PROXIMA_ON_DEMAND_") {
        warnings.push(
            "Process tokens are disabled while PROXIMA_ON_DEMAND_* env vars exist. Use double underscores (example: PROXIMA_ON_DEMAND__TOKEN_SECRET)."
                .to_string(),
        );
    }

    if !providers.mapy.is_configured()
        && !providers.google.is_configured()
        && !providers.nominatim.enabled
    {
        warnings.push("No place provider is configured; discovery and geocoding will fail.".to_string());
    }

    warnings
}

fn has_env_prefix(keys: &[String], prefix: &str) -> bool {
    keys.iter().any(|key| key.starts_with(prefix))
}
