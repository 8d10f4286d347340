use clap::Subcommand;

/// Review queue for ambiguous discovery candidates.
#[derive(Clone, Debug, Subcommand)]
pub enum ReviewCommands {
    /// List review items (pending by default).
    List {
        /// pending, approved, rejected, or all
        #[arg(long, default_value = "pending")]
        status: String,
        #[arg(long, requires = "entity_type")]
        entity_id: Option<i64>,
        #[arg(long, requires = "entity_id")]
        entity_type: Option<String>,
    },
    /// Approve or reject a pending item.
    Resolve {
        #[arg(long)]
        id: i64,
        /// approve or reject
        #[arg(long)]
        decision: String,
    },
    /// Counts by status and the age of the oldest pending item.
    Stats,
}
