//! Entity structs for the pipeline's domain objects.
//!
//! Queue, cache, review, and discovery-state structs map to tables in the
//! libSQL database owned by `prox-db`. `LocationEntity` is the read model of the
//! collaborator store. All structs derive `Serialize`, `Deserialize`, and
//! `JsonSchema` so CLI output can be validated against generated schemas.

mod cache;
mod discovery;
mod location;
mod review;
mod task;

pub use cache::{CacheEntry, IsochroneSet, NearbyMatch, NearbySet};
pub use discovery::{DiscoveryCandidate, DiscoveryState};
pub use location::{EntityRef, EntitySummary, LocationEntity};
pub use review::{ReviewQueueItem, ReviewStats};
pub use task::{NewTask, QueueStats, QueueTask};
