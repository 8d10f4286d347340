//! Confidence scoring and the accept/review decision.
//!
//! Score = 100 × (w_distance·distance + w_name·name + w_category·category),
//! each component in `[0, 1]`. Every component contributes a reason string
//! so reviewers see why a candidate landed where it did.

use std::cmp::Ordering;

use prox_config::DiscoveryConfig;
use prox_core::entities::{DiscoveryCandidate, LocationEntity};
use prox_core::enums::EntityType;
use prox_core::geo::Coordinates;

use super::normalize::{normalize_name, tokens};

/// Category component when the provider gave no categories at all.
const UNKNOWN_CATEGORY_SCORE: f64 = 0.5;

pub struct Scorer<'a> {
    config: &'a DiscoveryConfig,
}

impl<'a> Scorer<'a> {
    #[must_use]
    pub const fn new(config: &'a DiscoveryConfig) -> Self {
        Self { config }
    }

    /// 1 within the full-score radius, falling linearly to 0 at the cutoff.
    #[must_use]
    pub fn distance_score(&self, distance_m: f64) -> f64 {
        let full = self.config.full_score_radius_m;
        let cutoff = self.config.distance_cutoff_m;
        if distance_m <= full {
            1.0
        } else if distance_m >= cutoff {
            0.0
        } else {
            (cutoff - distance_m) / (cutoff - full)
        }
    }

    /// Fill in `distance_m`, `confidence_score`, and `match_reasons`.
    #[must_use]
    pub fn score(
        &self,
        entity: &LocationEntity,
        center: Coordinates,
        mut candidate: DiscoveryCandidate,
    ) -> DiscoveryCandidate {
        // Stored at 0.1 m; the reasons and the cap check both see this value.
        let distance_m = (center.distance_m(&candidate.candidate_coordinates) * 10.0).round() / 10.0;
        let distance = self.distance_score(distance_m);
        let name = name_similarity(&entity.display_name, &candidate.candidate_name);
        let category = category_match(entity.entity_type, &candidate.categories);

        let weights = &self.config.weights;
        let raw = weights.distance * distance
            + weights.name * name
            + weights.category * category.map_or(UNKNOWN_CATEGORY_SCORE, f64::from);

        let mut reasons = Vec::with_capacity(3);
        if distance_m > self.config.hard_distance_cap_m {
            reasons.push(format!("distance {distance_m:.0}m > cap"));
        } else {
            reasons.push(format!("distance {distance_m:.0}m"));
        }
        reasons.push(format!("name similarity {:.0}%", name * 100.0));
        if category == Some(false) {
            reasons.push("category mismatch".to_string());
        }

        candidate.distance_m = distance_m;
        candidate.confidence_score = ((raw * 100.0).clamp(0.0, 100.0) * 100.0).round() / 100.0;
        candidate.match_reasons = reasons;
        candidate
    }
}

/// Best of normalized Levenshtein and token overlap (Jaccard) on normalized names.
#[must_use]
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let (na, nb) = (normalize_name(a), normalize_name(b));
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }
    let edit = strsim::normalized_levenshtein(&na, &nb);

    let (ta, tb) = (tokens(a), tokens(b));
    let shared = ta.iter().filter(|t| tb.contains(t)).count();
    let union = ta.len() + tb.len() - shared;
    #[allow(clippy::cast_precision_loss)]
    let overlap = if union == 0 {
        0.0
    } else {
        shared as f64 / union as f64
    };
    edit.max(overlap)
}

/// `None` when the provider gave no categories to compare.
#[must_use]
pub fn category_match(entity_type: EntityType, categories: &[String]) -> Option<bool> {
    if categories.is_empty() {
        return None;
    }
    let keywords = entity_type.category_keywords();
    Some(categories.iter().any(|c| {
        let c = normalize_name(c);
        keywords.iter().any(|k| c.contains(k))
    }))
}

/// Ranking: score desc, distance asc, then provider and external id for a total order.
#[must_use]
pub fn rank(a: &DiscoveryCandidate, b: &DiscoveryCandidate) -> Ordering {
    b.confidence_score
        .total_cmp(&a.confidence_score)
        .then(a.distance_m.total_cmp(&b.distance_m))
        .then(a.source_provider.cmp(&b.source_provider))
        .then(a.external_id.cmp(&b.external_id))
}

/// What to do with one provider's scored candidates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Decision {
    pub accepted: Option<DiscoveryCandidate>,
    pub review: Vec<DiscoveryCandidate>,
}

/// Accept the best candidate if it clears both the threshold and the cap
/// (inclusive); otherwise queue every candidate above the relevance floor.
#[must_use]
pub fn decide(mut candidates: Vec<DiscoveryCandidate>, config: &DiscoveryConfig) -> Decision {
    candidates.sort_by(rank);
    if let Some(best) = candidates.first()
        && best.confidence_score >= config.accept_threshold
        && best.distance_m <= config.hard_distance_cap_m
    {
        return Decision {
            accepted: candidates.into_iter().next(),
            review: Vec::new(),
        };
    }
    Decision {
        accepted: None,
        review: candidates
            .into_iter()
            .filter(|c| c.confidence_score >= config.min_relevance)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use prox_core::enums::ProviderId;
    use rstest::rstest;

    fn config() -> DiscoveryConfig {
        DiscoveryConfig::default()
    }

    fn entity(name: &str, entity_type: EntityType) -> (LocationEntity, Coordinates) {
        let center = Coordinates::new(50.075, 14.438).unwrap();
        let entity = LocationEntity {
            id: 1,
            entity_type,
            coordinates: Some(center),
            display_name: name.to_string(),
            external_ids: std::collections::BTreeMap::new(),
        };
        (entity, center)
    }

    fn scored(score: f64, distance_m: f64, provider: ProviderId, id: &str) -> DiscoveryCandidate {
        let mut c = DiscoveryCandidate::new(
            provider,
            id,
            "x",
            Coordinates::new(50.0, 14.0).unwrap(),
            Vec::new(),
        );
        c.confidence_score = score;
        c.distance_m = distance_m;
        c
    }

    #[rstest]
    #[case(0.0, 1.0)]
    #[case(50.0, 1.0)]
    #[case(275.0, 0.5)]
    #[case(500.0, 0.0)]
    #[case(2_000.0, 0.0)]
    fn distance_score_is_linear_between_radius_and_cutoff(
        #[case] distance_m: f64,
        #[case] expected: f64,
    ) {
        let config = config();
        let score = Scorer::new(&config).distance_score(distance_m);
        assert!((score - expected).abs() < 1e-9, "{distance_m} → {score}");
    }

    #[test]
    fn diacritics_and_case_do_not_affect_name_similarity() {
        let sim = name_similarity("Kavárna Dobrá chuť", "Kavárna Dobra Chut");
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn token_overlap_wins_for_reordered_names() {
        let sim = name_similarity("Dobrá chuť kavárna", "Kavárna Dobrá chuť");
        assert!((sim - 1.0).abs() < 1e-9);
        assert!(name_similarity("Nabíječka Tesco", "Hotel Palace") < 0.4);
    }

    #[test]
    fn category_keywords_match_folded_labels() {
        assert_eq!(
            category_match(EntityType::Poi, &["Kavárna".to_string()]),
            Some(true)
        );
        assert_eq!(
            category_match(EntityType::Charger, &["restaurant".to_string()]),
            Some(false)
        );
        assert_eq!(category_match(EntityType::CampSpot, &[]), None);
    }

    #[test]
    fn close_exact_match_scores_full_marks() {
        let config = config();
        let (entity, center) = entity("Kavárna Dobra Chut", EntityType::Poi);
        let candidate = DiscoveryCandidate::new(
            ProviderId::Mapy,
            "m-1",
            "Kavárna Dobrá chuť",
            center.offset_m(40.0, 0.0).unwrap(),
            vec!["kavárna".into()],
        );
        let scored = Scorer::new(&config).score(&entity, center, candidate);
        assert!((scored.confidence_score - 100.0).abs() < 1e-9);
        assert_eq!(scored.match_reasons, vec!["distance 40m", "name similarity 100%"]);
    }

    #[test]
    fn cap_reason_agrees_with_the_stored_distance() {
        let mut config = config();
        let (entity, center) = entity("Kavárna Dobra Chut", EntityType::Poi);
        let at = center.offset_m(123.456, 0.0).unwrap();
        let raw = center.distance_m(&at);
        let stored = (raw * 10.0).round() / 10.0;
        assert!((raw - stored).abs() > 1e-6);
        // Cap between the raw and the stored distance.
        config.hard_distance_cap_m = (raw + stored) / 2.0;

        let candidate = DiscoveryCandidate::new(
            ProviderId::Mapy,
            "m-1",
            "Kavárna Dobrá chuť",
            at,
            vec!["kavárna".into()],
        );
        let scored = Scorer::new(&config).score(&entity, center, candidate);
        assert!((scored.distance_m - stored).abs() < 1e-9);
        let over_cap = scored.distance_m > config.hard_distance_cap_m;
        assert_eq!(
            scored.match_reasons[0].ends_with("> cap"),
            over_cap,
            "{:?}",
            scored.match_reasons
        );
    }

    #[test]
    fn mismatched_category_is_reported() {
        let config = config();
        let (entity, center) = entity("Kemp Džbán", EntityType::CampSpot);
        let candidate = DiscoveryCandidate::new(
            ProviderId::Google,
            "g-1",
            "Kemp Džbán",
            center,
            vec!["restaurant".into()],
        );
        let scored = Scorer::new(&config).score(&entity, center, candidate);
        assert!((scored.confidence_score - 85.0).abs() < 1e-9);
        assert_eq!(scored.match_reasons.last().unwrap(), "category mismatch");
    }

    #[test]
    fn threshold_and_cap_are_inclusive() {
        let config = config();
        let at_boundary = scored(
            config.accept_threshold,
            config.hard_distance_cap_m,
            ProviderId::Mapy,
            "a",
        );
        let decision = decide(vec![at_boundary.clone()], &config);
        assert_eq!(decision.accepted, Some(at_boundary));

        let just_below = scored(
            config.accept_threshold - 0.01,
            config.hard_distance_cap_m,
            ProviderId::Mapy,
            "a",
        );
        let decision = decide(vec![just_below], &config);
        assert!(decision.accepted.is_none());
        assert_eq!(decision.review.len(), 1);

        let too_far = scored(99.0, config.hard_distance_cap_m + 0.1, ProviderId::Mapy, "a");
        assert!(decide(vec![too_far], &config).accepted.is_none());
    }

    #[test]
    fn review_drops_irrelevant_candidates() {
        let config = config();
        let decision = decide(
            vec![
                scored(50.0, 300.0, ProviderId::Google, "a"),
                scored(config.min_relevance - 1.0, 450.0, ProviderId::Google, "b"),
            ],
            &config,
        );
        assert_eq!(decision.review.len(), 1);
        assert_eq!(decision.review[0].external_id, "a");
    }

    #[test]
    fn ranking_is_independent_of_input_order() {
        let config = config();
        let a = scored(60.0, 120.0, ProviderId::Google, "a");
        let b = scored(60.0, 80.0, ProviderId::Google, "b");
        let c = scored(60.0, 80.0, ProviderId::Google, "c");
        let d = scored(30.0, 10.0, ProviderId::Google, "d");

        let forward = decide(vec![a.clone(), b.clone(), c.clone(), d.clone()], &config);
        let backward = decide(vec![d, c, b, a], &config);
        assert_eq!(forward, backward);
        let ids: Vec<&str> = forward.review.iter().map(|c| c.external_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a", "d"]);
    }
}
