use clap::Subcommand;

use crate::cli::root_commands::OriginArgs;

/// Work queue administration.
#[derive(Clone, Debug, Subcommand)]
pub enum QueueCommands {
    /// Task counts by status and the age of the oldest pending task.
    Stats,
    /// List tasks.
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        kind: Option<String>,
    },
    /// Enqueue a task for one entity.
    Enqueue {
        #[command(flatten)]
        origin: OriginArgs,
        /// nearby, isochrone, or discovery
        #[arg(long, default_value = "nearby")]
        kind: String,
        #[arg(long, default_value_t = 0)]
        priority: i64,
        /// Also enqueue every origin whose nearby sets reference this entity.
        #[arg(long)]
        affected: bool,
    },
    /// Move failed tasks back to pending.
    RequeueFailed {
        #[arg(long)]
        kind: Option<String>,
    },
    /// Process one batch now.
    Run {
        /// Defaults to `queue.batch_size`.
        #[arg(long)]
        batch_size: Option<usize>,
    },
}
