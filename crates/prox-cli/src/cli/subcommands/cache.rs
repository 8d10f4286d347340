use clap::Subcommand;

/// Cache administration.
#[derive(Clone, Debug, Subcommand)]
pub enum CacheCommands {
    /// Delete cache entries whose key matches a glob pattern.
    Invalidate {
        /// Key pattern, e.g. `nearby:charger:42:*`.
        #[arg(long, conflicts_with = "origin_id", required_unless_present = "origin_id")]
        pattern: Option<String>,
        /// Invalidate every nearby set of this origin instead.
        #[arg(long, requires = "origin_type")]
        origin_id: Option<i64>,
        #[arg(long)]
        origin_type: Option<String>,
    },
    /// Delete entries expired longer than the purge grace period.
    Purge,
}
