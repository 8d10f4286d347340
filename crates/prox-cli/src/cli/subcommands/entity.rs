use clap::Subcommand;

use crate::cli::root_commands::OriginArgs;

/// Location records in the local entity store.
///
/// Every change enqueues recomputation for the affected origins.
#[derive(Clone, Debug, Subcommand)]
pub enum EntityCommands {
    /// Insert or update a location.
    Upsert {
        #[command(flatten)]
        origin: OriginArgs,
        #[arg(long)]
        name: String,
        #[arg(long, allow_hyphen_values = true, requires = "lng")]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lng: Option<f64>,
    },
    /// Remove a location.
    Remove {
        #[command(flatten)]
        origin: OriginArgs,
    },
    /// Show a location with its external ids.
    Get {
        #[command(flatten)]
        origin: OriginArgs,
    },
}
