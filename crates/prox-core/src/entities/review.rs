use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::DiscoveryCandidate;
use crate::enums::{EntityType, ReviewStatus};

/// An ambiguous discovery candidate awaiting a human decision.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ReviewQueueItem {
    pub id: i64,
    pub entity_id: i64,
    pub entity_type: EntityType,
    pub candidate: DiscoveryCandidate,
    pub distance_m: f64,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Review backlog summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReviewStats {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub oldest_pending_age_secs: Option<i64>,
}
