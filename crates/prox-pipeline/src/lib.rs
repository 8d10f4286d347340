//! # prox-pipeline
//!
//! The processing side of Proxima:
//! - [`queue::WorkQueue`]: enqueue rules and affected-set fan-out after mutations
//! - [`batch::BatchProcessor`]: bounded queue drains with a soft circuit breaker
//! - [`on_demand::OnDemandProcessor`]: cached-or-computed answers under a time budget
//! - [`discovery::DiscoveryEngine`]: provider reconciliation, scoring, review queue
//! - [`cache_policy`]: TTLs, cache keys, and typed cache access
//! - [`scheduler::Scheduler`]: the recurring sweep behind `pxm serve`
//!
//! Services are plain structs over `Arc`-shared stores, built once by
//! [`Pipeline::new`] and cloned into tasks as needed.

pub mod batch;
pub mod cache_policy;
pub mod discovery;
pub mod geocode;
pub mod isochrone;
pub mod lock;
pub mod nearby;
pub mod on_demand;
pub mod queue;
pub mod retry;
pub mod scheduler;
pub mod token;

mod error;

use std::sync::Arc;
use std::time::Duration;

use prox_config::ProximaConfig;
use prox_core::store::EntityStore;
use prox_db::ProxDb;
use prox_providers::Providers;

use batch::BatchProcessor;
use cache_policy::CachePolicy;
use discovery::DiscoveryEngine;
use geocode::CachedGeocoder;
use isochrone::IsochroneService;
use lock::ComputeLocks;
use nearby::NearbyService;
use on_demand::OnDemandProcessor;
use queue::WorkQueue;
use retry::RetryPolicy;
use scheduler::Scheduler;

/// Every pipeline service, wired to the same database, store, and providers.
#[derive(Clone)]
pub struct Pipeline {
    pub cache: CachePolicy,
    pub queue: WorkQueue,
    pub nearby: NearbyService,
    pub isochrone: IsochroneService,
    pub discovery: DiscoveryEngine,
    pub geocoder: CachedGeocoder,
    pub batch: BatchProcessor,
    pub on_demand: OnDemandProcessor,
    sweep_interval: Duration,
    batch_size: usize,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        config: &ProximaConfig,
        db: Arc<ProxDb>,
        store: Arc<dyn EntityStore>,
        providers: Providers,
    ) -> Self {
        let retry = RetryPolicy::from_discovery(&config.discovery);
        let cache = CachePolicy::new(Arc::clone(&db), config.cache.clone());
        let queue = WorkQueue::new(
            Arc::clone(&db),
            Arc::clone(&store),
            cache.clone(),
            &config.queue,
            config.nearby.clone(),
        );
        let nearby = NearbyService::new(
            Arc::clone(&db),
            Arc::clone(&store),
            cache.clone(),
            config.nearby.clone(),
        );
        let isochrone = IsochroneService::new(
            Arc::clone(&store),
            providers.isochrone.clone(),
            cache.clone(),
            config.providers.isochrone.clone(),
            retry,
        );
        let discovery = DiscoveryEngine::new(
            Arc::clone(&db),
            store,
            providers.clone(),
            config.discovery.clone(),
            retry,
        );
        let geocoder = CachedGeocoder::new(providers, cache.clone(), retry);
        let locks = ComputeLocks::new(db, seconds(config.on_demand.lock_ttl_secs));
        let batch = BatchProcessor::new(
            queue.clone(),
            nearby.clone(),
            isochrone.clone(),
            discovery.clone(),
            locks.clone(),
            seconds(config.on_demand.retry_after_secs),
            config.queue.breaker_threshold,
        );
        let on_demand = OnDemandProcessor::new(
            locks,
            queue.clone(),
            nearby.clone(),
            isochrone.clone(),
            &config.on_demand,
        );

        Self {
            cache,
            queue,
            nearby,
            isochrone,
            discovery,
            geocoder,
            batch,
            on_demand,
            sweep_interval: Duration::from_secs(config.queue.sweep_interval_secs.max(1)),
            batch_size: config.queue.batch_size,
        }
    }

    #[must_use]
    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(
            self.batch.clone(),
            self.queue.clone(),
            self.cache.clone(),
            self.sweep_interval,
            self.batch_size,
        )
    }
}

/// Longest duration we build from configured seconds (a century).
const MAX_SECS: i64 = 100 * 365 * 24 * 3_600;

/// Configured seconds as a `chrono::Duration`, saturating instead of panicking.
pub(crate) fn seconds(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(i64::try_from(secs).unwrap_or(MAX_SECS).min(MAX_SECS))
}
