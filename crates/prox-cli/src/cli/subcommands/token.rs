use clap::Subcommand;

use crate::cli::root_commands::OriginArgs;

#[derive(Clone, Debug, Subcommand)]
pub enum TokenCommands {
    /// Issue a short-lived process token for one origin.
    Issue {
        #[command(flatten)]
        origin: OriginArgs,
    },
}
