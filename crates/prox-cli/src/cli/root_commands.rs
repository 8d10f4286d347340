use clap::{Args, Subcommand};

use crate::cli::subcommands::{
    CacheCommands, EntityCommands, QueueCommands, ReviewCommands, TokenCommands,
};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Nearby entities of an origin, from cache or computed within the time budget.
    Nearby(NearbyArgs),
    /// Travel-time polygons around an origin.
    Isochrone(IsochroneArgs),
    /// Recompute nearby sets now, authorized by a process token.
    Process(ProcessArgs),
    /// Process tokens.
    Token {
        #[command(subcommand)]
        action: TokenCommands,
    },
    /// Match an entity against external place providers.
    Discover(DiscoverArgs),
    /// Review queue for ambiguous discovery candidates.
    Review {
        #[command(subcommand)]
        action: ReviewCommands,
    },
    /// Work queue administration.
    Queue {
        #[command(subcommand)]
        action: QueueCommands,
    },
    /// Cache administration.
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
    /// Forward geocoding through a place provider (cached).
    Geocode(GeocodeArgs),
    /// Reverse geocoding through a place provider (cached).
    Reverse(ReverseArgs),
    /// Run the scheduler loop until interrupted.
    Serve(ServeArgs),
    /// Location records in the local entity store.
    Entity {
        #[command(subcommand)]
        action: EntityCommands,
    },
}

/// The entity a command is about.
#[derive(Clone, Debug, Args)]
pub struct OriginArgs {
    #[arg(long)]
    pub origin_id: i64,
    /// charger, poi, or camp_spot
    #[arg(long)]
    pub origin_type: String,
}

/// Arguments for `pxm nearby`.
#[derive(Clone, Debug, Args)]
pub struct NearbyArgs {
    #[command(flatten)]
    pub origin: OriginArgs,
    /// Restrict to one candidate type (defaults to every configured target).
    #[arg(long)]
    pub target_type: Option<String>,
}

/// Arguments for `pxm isochrone`.
#[derive(Clone, Debug, Args)]
pub struct IsochroneArgs {
    #[command(flatten)]
    pub origin: OriginArgs,
    /// Routing profile (defaults to `providers.isochrone.profile`).
    #[arg(long)]
    pub profile: Option<String>,
    /// Travel times in seconds, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub ranges: Vec<u32>,
}

/// Arguments for `pxm process`.
#[derive(Clone, Debug, Args)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub origin: OriginArgs,
    #[arg(long)]
    pub token: String,
}

/// Arguments for `pxm discover`.
#[derive(Clone, Debug, Args)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub origin: OriginArgs,
    /// Query every provider regardless of region.
    #[arg(long)]
    pub thorough: bool,
    /// Re-query providers the entity already has an id for.
    #[arg(long)]
    pub force: bool,
    /// Enqueue a discovery task instead of running now.
    #[arg(long)]
    pub queue: bool,
}

/// Arguments for `pxm geocode`.
#[derive(Clone, Debug, Args)]
pub struct GeocodeArgs {
    pub query: String,
    /// mapy, google, or nominatim (defaults to the first configured).
    #[arg(long)]
    pub provider: Option<String>,
}

/// Arguments for `pxm reverse`.
#[derive(Clone, Debug, Args)]
pub struct ReverseArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,
    #[arg(long)]
    pub provider: Option<String>,
}

/// Arguments for `pxm serve`.
#[derive(Clone, Debug, Args)]
pub struct ServeArgs {
    /// Sweep once and exit instead of looping.
    #[arg(long)]
    pub once: bool,
}
