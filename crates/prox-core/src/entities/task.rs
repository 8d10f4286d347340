use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{EntityType, TaskKind, TaskStatus};

/// A unit of work in the durable work queue.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct QueueTask {
    pub id: i64,
    pub entity_id: i64,
    pub entity_type: EntityType,
    pub kind: TaskKind,
    /// Workload-specific parameters (e.g. isochrone profile and ranges).
    pub payload: Option<serde_json::Value>,
    pub priority: i64,
    pub status: TaskStatus,
    pub attempts: u32,
    /// Set when the entity was re-enqueued while this task was processing.
    pub follow_up: bool,
    pub last_error: Option<String>,
    pub available_at: DateTime<Utc>,
    pub enqueued_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating a queue task.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub entity_id: i64,
    pub entity_type: EntityType,
    pub kind: TaskKind,
    pub priority: i64,
    pub payload: Option<serde_json::Value>,
}

impl NewTask {
    /// A nearby-recompute task, the default workload.
    #[must_use]
    pub const fn nearby(entity_id: i64, entity_type: EntityType, priority: i64) -> Self {
        Self {
            entity_id,
            entity_type,
            kind: TaskKind::Nearby,
            priority,
            payload: None,
        }
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Queue counts for operator visibility and on-demand defer decisions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub done: u64,
    pub failed: u64,
    /// Age in seconds of the oldest pending task, if any.
    pub oldest_pending_age_secs: Option<i64>,
}
