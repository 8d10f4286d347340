use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use prox_config::ProximaConfig;
use prox_core::store::EntityStore;
use prox_db::ProxDb;
use prox_pipeline::Pipeline;
use prox_providers::Providers;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub config: ProximaConfig,
    pub db: Arc<ProxDb>,
    pub pipeline: Pipeline,
}

impl AppContext {
    /// Open the database, build the configured providers, and wire the pipeline.
    ///
    /// The local `locations` tables serve as the entity store.
    pub async fn init(config: ProximaConfig, database: Option<&str>) -> anyhow::Result<Self> {
        let path = database.map_or_else(|| config.database.path.clone(), str::to_string);
        if path != ":memory:"
            && let Some(parent) = Path::new(&path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let db = Arc::new(
            ProxDb::open_local(&path)
                .await
                .with_context(|| format!("failed to open database at {path}"))?,
        );
        let store: Arc<dyn EntityStore> = db.clone();
        let providers = Providers::from_config(&config.providers);
        let pipeline = Pipeline::new(&config, Arc::clone(&db), store, providers);

        Ok(Self {
            config,
            db,
            pipeline,
        })
    }
}
