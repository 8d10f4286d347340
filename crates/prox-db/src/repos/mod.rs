//! Repository methods, implemented as `impl ProxDb` blocks per table.

pub mod cache;
pub mod discovery_state;
pub mod locations;
pub mod locks;
pub mod queue;
pub mod refs;
pub mod review;

pub use queue::{EnqueueOutcome, TaskFilter};
pub use review::ReviewFilter;
