//! Entity types, task and review statuses, and provider identifiers.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`
//! and expose `as_str()` for SQL storage. Status enums with state machines provide
//! `allowed_next_states()` to enforce valid transitions at the application layer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// Kind of mappable location record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Charger,
    Poi,
    CampSpot,
}

impl EntityType {
    pub const ALL: [Self; 3] = [Self::Charger, Self::Poi, Self::CampSpot];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Charger => "charger",
            Self::Poi => "poi",
            Self::CampSpot => "camp_spot",
        }
    }

    /// Lowercase, diacritic-free category labels that providers use for this type.
    ///
    /// Matched as substrings against normalized provider categories.
    #[must_use]
    pub const fn category_keywords(self) -> &'static [&'static str] {
        match self {
            Self::Charger => &[
                "charging",
                "charger",
                "nabijeci",
                "nabijeni",
                "ev station",
                "electric vehicle",
            ],
            Self::Poi => &[
                "point of interest",
                "poi",
                "tourist",
                "attraction",
                "restaurant",
                "cafe",
                "kavarna",
                "museum",
                "viewpoint",
            ],
            Self::CampSpot => &["camp", "kemp", "caravan", "rv park", "tabor"],
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "charger" => Ok(Self::Charger),
            "poi" => Ok(Self::Poi),
            "camp_spot" | "campspot" | "camp-spot" => Ok(Self::CampSpot),
            other => Err(CoreError::Validation(format!("unknown entity type '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// TaskKind
// ---------------------------------------------------------------------------

/// The three workloads the work queue carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Nearby,
    Isochrone,
    Discovery,
}

impl TaskKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nearby => "nearby",
            Self::Isochrone => "isochrone",
            Self::Discovery => "discovery",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearby" => Ok(Self::Nearby),
            "isochrone" => Ok(Self::Isochrone),
            "discovery" => Ok(Self::Discovery),
            other => Err(CoreError::Validation(format!("unknown task kind '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

/// Status of a work queue task.
///
/// ```text
/// pending → processing → done
///                      → pending (retry / follow-up)
///                      → failed → pending (re-enqueue)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl TaskStatus {
    #[must_use]
    #[allow(clippy::match_same_arms)]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Processing],
            Self::Processing => &[Self::Done, Self::Pending, Self::Failed],
            Self::Failed => &[Self::Pending],
            Self::Done => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    /// Pending and processing tasks count against the one-in-flight rule.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ReviewStatus
// ---------------------------------------------------------------------------

/// Status of a review queue item.
///
/// ```text
/// pending → approved
///         → rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Approved, Self::Rejected],
            Self::Approved | Self::Rejected => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" | "approve" => Ok(Self::Approved),
            "rejected" | "reject" => Ok(Self::Rejected),
            other => Err(CoreError::Validation(format!("unknown review status '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// DiscoveryStatus
// ---------------------------------------------------------------------------

/// Outcome recorded for the last discovery run of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStatus {
    Succeeded,
    Failed,
}

impl DiscoveryStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DiscoveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ProviderId
// ---------------------------------------------------------------------------

/// External geodata provider a candidate came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Domestic provider (Mapy.cz).
    Mapy,
    /// International provider (Google Places).
    Google,
    /// International provider (OpenStreetMap Nominatim).
    Nominatim,
}

impl ProviderId {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mapy => "mapy",
            Self::Google => "google",
            Self::Nominatim => "nominatim",
        }
    }

    #[must_use]
    pub const fn is_domestic(self) -> bool {
        matches!(self, Self::Mapy)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mapy" | "mapy.cz" => Ok(Self::Mapy),
            "google" => Ok(Self::Google),
            "nominatim" | "osm" => Ok(Self::Nominatim),
            other => Err(CoreError::Validation(format!("unknown provider '{other}'"))),
        }
    }
}
