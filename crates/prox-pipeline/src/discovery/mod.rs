//! Discovery & reconciliation engine.
//!
//! Queries place providers around an entity, scores every candidate, attaches
//! confident matches through the entity store, and queues ambiguous ones for
//! human review. Decisions are made per provider: each provider contributes
//! at most one accepted external id.

pub mod normalize;
pub mod region;
pub mod scoring;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use prox_config::DiscoveryConfig;
use prox_core::entities::{
    DiscoveryCandidate, EntityRef, LocationEntity, ReviewQueueItem, ReviewStats,
};
use prox_core::enums::{DiscoveryStatus, ProviderId, ReviewStatus};
use prox_core::errors::PipelineError;
use prox_core::responses::{DiscoveryReport, ProviderFailure};
use prox_core::store::EntityStore;
use prox_db::ProxDb;
use prox_db::error::DatabaseError;
use prox_db::repos::ReviewFilter;
use prox_providers::{PlaceProvider, PlaceQuery, Providers};
use serde::{Deserialize, Serialize};

use crate::nearby::require_coordinates;
use crate::retry::RetryPolicy;
use region::{ProviderPlan, Region};
use scoring::{Decision, Scorer, decide, rank};

/// Candidates requested from each provider.
const CANDIDATES_PER_PROVIDER: usize = 10;

/// Per-run switches. Also the payload of queued discovery tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryOptions {
    /// Query every configured provider regardless of region.
    #[serde(default)]
    pub thorough: bool,
    /// Re-query providers the entity already has an accepted id for.
    #[serde(default)]
    pub force: bool,
}

impl DiscoveryOptions {
    pub fn from_payload(payload: Option<&serde_json::Value>) -> Result<Self, PipelineError> {
        payload.map_or_else(
            || Ok(Self::default()),
            |value| {
                serde_json::from_value(value.clone())
                    .map_err(|e| PipelineError::Input(format!("bad discovery payload: {e}")))
            },
        )
    }

    #[must_use]
    pub fn to_payload(self) -> serde_json::Value {
        serde_json::json!({ "thorough": self.thorough, "force": self.force })
    }
}

#[derive(Clone)]
pub struct DiscoveryEngine {
    db: Arc<ProxDb>,
    store: Arc<dyn EntityStore>,
    providers: Providers,
    config: DiscoveryConfig,
    retry: RetryPolicy,
}

/// Results gathered from one group of providers.
#[derive(Default)]
struct Gathered {
    queried: Vec<ProviderId>,
    failures: Vec<ProviderFailure>,
    candidates: Vec<DiscoveryCandidate>,
}

impl DiscoveryEngine {
    #[must_use]
    pub fn new(
        db: Arc<ProxDb>,
        store: Arc<dyn EntityStore>,
        providers: Providers,
        config: DiscoveryConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            db,
            store,
            providers,
            config,
            retry,
        }
    }

    /// Reconcile one entity against the providers for its region.
    ///
    /// # Errors
    ///
    /// `Input` for unknown entities or missing coordinates, `Config` when no
    /// place provider is configured, and `TransientProvider` when every
    /// queried provider failed (the discovery state is marked failed first).
    pub async fn discover(
        &self,
        entity: EntityRef,
        options: DiscoveryOptions,
    ) -> Result<DiscoveryReport, PipelineError> {
        let location = self.store.get_entity(entity.id, entity.entity_type).await?;
        let center = require_coordinates(&location)?;
        if self.providers.all().is_empty() {
            return Err(PipelineError::Config("no place provider configured".into()));
        }

        let region = Region::of(&center, &self.config.domestic_bbox);
        let plan = ProviderPlan::for_region(&self.providers, region, options.thorough)
            .retain(|p| options.force || !location.external_ids.contains_key(&p.id()));

        let mut report = DiscoveryReport {
            entity_id: entity.id,
            entity_type: entity.entity_type,
            providers_queried: Vec::new(),
            accepted: Vec::new(),
            queued_for_review: Vec::new(),
            provider_failures: Vec::new(),
            skipped: false,
        };
        if plan.primary.is_empty() {
            tracing::debug!(entity_id = entity.id, "every provider already matched; skipping");
            report.skipped = true;
            return Ok(report);
        }

        let query = PlaceQuery {
            name: location.display_name.clone(),
            center,
            radius_m: self.config.search_radius_m,
            entity_type: entity.entity_type,
            limit: CANDIDATES_PER_PROVIDER,
        };
        let mut gathered = Gathered::default();
        self.gather(&plan.primary, &query, &location, &mut gathered)
            .await;

        let relevant = gathered
            .candidates
            .iter()
            .any(|c| c.confidence_score >= self.config.min_relevance);
        if !relevant && !plan.fallback.is_empty() {
            tracing::info!(
                entity_id = entity.id,
                ?region,
                "no relevant domestic candidates; trying international providers"
            );
            self.gather(&plan.fallback, &query, &location, &mut gathered)
                .await;
        }

        report.providers_queried.clone_from(&gathered.queried);
        report.provider_failures.clone_from(&gathered.failures);

        if gathered.failures.len() == gathered.queried.len() {
            let reason = gathered
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.provider, f.message))
                .collect::<Vec<_>>()
                .join("; ");
            self.db
                .record_discovery(entity, DiscoveryStatus::Failed, Some(&reason), Utc::now())
                .await?;
            return Err(PipelineError::TransientProvider {
                provider: gathered
                    .queried
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                message: reason,
            });
        }

        for (provider, candidates) in group_by_provider(gathered.candidates) {
            let Decision { accepted, review } = decide(candidates, &self.config);
            if let Some(best) = accepted {
                self.accept(&location, &best, "discovery").await?;
                tracing::info!(
                    entity_id = entity.id,
                    %provider,
                    external_id = %best.external_id,
                    score = best.confidence_score,
                    "candidate accepted"
                );
                report.accepted.push(best);
            }
            for candidate in review {
                if let Some(item) = self
                    .db
                    .insert_review_item(entity, &candidate, Utc::now())
                    .await?
                {
                    report.queued_for_review.push(item);
                }
            }
        }

        let partial = (!gathered.failures.is_empty()).then(|| {
            format!(
                "{} of {} providers failed",
                gathered.failures.len(),
                gathered.queried.len()
            )
        });
        self.db
            .record_discovery(
                entity,
                DiscoveryStatus::Succeeded,
                partial.as_deref(),
                Utc::now(),
            )
            .await?;
        tracing::info!(
            entity_id = entity.id,
            entity_type = %entity.entity_type,
            accepted = report.accepted.len(),
            review = report.queued_for_review.len(),
            failures = report.provider_failures.len(),
            "discovery finished"
        );
        Ok(report)
    }

    /// Query each provider with retries; failures are recorded, not raised.
    async fn gather(
        &self,
        providers: &[Arc<dyn PlaceProvider>],
        query: &PlaceQuery,
        location: &LocationEntity,
        into: &mut Gathered,
    ) {
        let scorer = Scorer::new(&self.config);
        for provider in providers {
            let id = provider.id();
            into.queried.push(id);
            match self
                .retry
                .run(id.as_str(), || provider.search_nearby(query))
                .await
            {
                Ok(found) => {
                    tracing::debug!(provider = %id, found = found.len(), "provider answered");
                    into.candidates.extend(
                        found
                            .into_iter()
                            .map(|c| scorer.score(location, query.center, c)),
                    );
                }
                Err(error) => {
                    tracing::warn!(provider = %id, %error, "provider query failed");
                    into.failures.push(ProviderFailure {
                        provider: id,
                        message: error.to_string(),
                    });
                }
            }
        }
    }

    async fn accept(
        &self,
        location: &LocationEntity,
        candidate: &DiscoveryCandidate,
        source: &str,
    ) -> Result<(), PipelineError> {
        let metadata = serde_json::json!({
            "source": source,
            "name": candidate.candidate_name,
            "confidence": candidate.confidence_score,
            "distance_m": candidate.distance_m,
            "reasons": candidate.match_reasons,
        });
        self.store
            .attach_external_id(
                location.id,
                location.entity_type,
                candidate.source_provider,
                &candidate.external_id,
                metadata,
            )
            .await?;
        Ok(())
    }

    /// Approve or reject a pending review item. Approval attaches the candidate's id.
    pub async fn resolve_review(
        &self,
        item_id: i64,
        decision: ReviewStatus,
    ) -> Result<ReviewQueueItem, PipelineError> {
        let item = self
            .db
            .get_review_item(item_id)
            .await
            .map_err(|e| review_error(item_id, e))?;
        if !item.status.can_transition_to(decision) {
            return Err(PipelineError::Input(format!(
                "review item {item_id} is {} and cannot become {decision}",
                item.status
            )));
        }
        if decision == ReviewStatus::Approved {
            let location = self
                .store
                .get_entity(item.entity_id, item.entity_type)
                .await?;
            self.accept(&location, &item.candidate, "review").await?;
        }
        let resolved = self
            .db
            .resolve_review_item(item_id, decision, Utc::now())
            .await
            .map_err(|e| review_error(item_id, e))?;
        tracing::info!(item_id, %decision, "review item resolved");
        Ok(resolved)
    }

    pub async fn reviews(&self, filter: &ReviewFilter) -> Result<Vec<ReviewQueueItem>, PipelineError> {
        Ok(self.db.list_review_items(filter).await?)
    }

    pub async fn review_stats(&self) -> Result<ReviewStats, PipelineError> {
        Ok(self.db.review_stats(Utc::now()).await?)
    }
}

/// Deduplicate by `(provider, external_id)`, keeping the better-ranked copy,
/// and split by provider.
fn group_by_provider(
    candidates: Vec<DiscoveryCandidate>,
) -> BTreeMap<ProviderId, Vec<DiscoveryCandidate>> {
    let mut unique: BTreeMap<(ProviderId, String), DiscoveryCandidate> = BTreeMap::new();
    for candidate in candidates {
        let key = (candidate.source_provider, candidate.external_id.clone());
        match unique.get(&key) {
            Some(existing) if rank(existing, &candidate).is_le() => {}
            _ => {
                unique.insert(key, candidate);
            }
        }
    }
    let mut grouped: BTreeMap<ProviderId, Vec<DiscoveryCandidate>> = BTreeMap::new();
    for ((provider, _), candidate) in unique {
        grouped.entry(provider).or_default().push(candidate);
    }
    grouped
}

fn review_error(item_id: i64, err: DatabaseError) -> PipelineError {
    match err {
        DatabaseError::NoResult => PipelineError::Input(format!("review item {item_id} not found")),
        DatabaseError::InvalidState(msg) => PipelineError::Input(msg),
        other => other.into(),
    }
}
