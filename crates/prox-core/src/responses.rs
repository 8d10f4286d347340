//! Response types returned to map clients and operators.
//!
//! These structs define the JSON shape of `pxm` output and of the service
//! calls behind the nearby, isochrone, process, and discovery surfaces.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{DiscoveryCandidate, ReviewQueueItem};
use crate::enums::{EntityType, ProviderId};

/// Result of an on-demand request.
///
/// `Deferred` is a first-class answer: the caller should poll again. Any data
/// it carries came from an expired cache entry and is marked stale.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Ready {
        data: T,
    },
    Deferred {
        reason: String,
        retry_after_secs: u64,
        stale: Option<T>,
    },
    Failed {
        reason: String,
    },
}

impl<T> Outcome<T> {
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }

    /// Fresh data, if any.
    #[must_use]
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready { data } => Some(data),
            Self::Deferred { .. } | Self::Failed { .. } => None,
        }
    }

    /// Transform the payload, keeping the status.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Ready { data } => Outcome::Ready { data: f(data) },
            Self::Deferred {
                reason,
                retry_after_secs,
                stale,
            } => Outcome::Deferred {
                reason,
                retry_after_secs,
                stale: stale.map(f),
            },
            Self::Failed { reason } => Outcome::Failed { reason },
        }
    }
}

/// A provider that could not be queried during discovery.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub message: String,
}

/// Response from `discover`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DiscoveryReport {
    pub entity_id: i64,
    pub entity_type: EntityType,
    pub providers_queried: Vec<ProviderId>,
    pub accepted: Vec<DiscoveryCandidate>,
    pub queued_for_review: Vec<ReviewQueueItem>,
    pub provider_failures: Vec<ProviderFailure>,
    /// True when every eligible provider already had an accepted id.
    pub skipped: bool,
}

/// Response from one batch processor run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Completed without recomputing: the cache was refreshed after the task was enqueued.
    pub skipped: usize,
    /// Returned to the queue for later because another worker held the origin's lock.
    pub postponed: usize,
    /// Claimed tasks returned to the queue untouched after the breaker tripped.
    pub released: usize,
    pub tripped: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn outcome_is_tagged_by_status() {
        let ready: Outcome<u32> = Outcome::Ready { data: 3 };
        assert_eq!(
            serde_json::to_value(&ready).unwrap(),
            serde_json::json!({"status": "ready", "data": 3})
        );

        let deferred: Outcome<u32> = Outcome::Deferred {
            reason: "processing".into(),
            retry_after_secs: 5,
            stale: Some(1),
        };
        assert_eq!(
            serde_json::to_value(&deferred).unwrap(),
            serde_json::json!({
                "status": "deferred",
                "reason": "processing",
                "retry_after_secs": 5,
                "stale": 1
            })
        );
    }

    #[test]
    fn map_preserves_status() {
        let deferred: Outcome<u32> = Outcome::Deferred {
            reason: "busy".into(),
            retry_after_secs: 2,
            stale: Some(4),
        };
        match deferred.map(|v| v * 10) {
            Outcome::Deferred { stale, .. } => assert_eq!(stale, Some(40)),
            other => panic!("expected deferred, got {other:?}"),
        }
    }
}
