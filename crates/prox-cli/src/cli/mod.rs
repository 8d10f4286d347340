use clap::Parser;

pub mod global;
pub mod root_commands;
pub mod subcommands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `pxm` binary.
#[derive(Debug, Parser)]
#[command(
    name = "pxm",
    version,
    about = "Proxima - proximity discovery and reconciliation pipeline"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Max results to return
    #[arg(short, long, global = true)]
    pub limit: Option<u32>,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Database path (overrides `database.path`)
    #[arg(long, global = true)]
    pub database: Option<String>,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            limit: self.limit,
            quiet: self.quiet,
            verbose: self.verbose,
            database: self.database.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;

    use super::subcommands::{QueueCommands, ReviewCommands};
    use super::{Cli, Commands, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from([
            "pxm", "--format", "table", "--limit", "10", "--verbose", "queue", "stats",
        ])
        .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Table);
        assert_eq!(cli.limit, Some(10));
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Queue {
                action: QueueCommands::Stats
            }
        ));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["pxm", "review", "stats", "--format", "raw", "--quiet"])
            .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Raw);
        assert!(cli.quiet);
        assert!(matches!(
            cli.command,
            Commands::Review {
                action: ReviewCommands::Stats
            }
        ));
    }

    #[test]
    fn nearby_takes_origin_and_optional_target() {
        let cli = Cli::try_parse_from([
            "pxm",
            "nearby",
            "--origin-id",
            "42",
            "--origin-type",
            "charger",
            "--target-type",
            "poi",
        ])
        .expect("cli should parse");

        let Commands::Nearby(args) = cli.command else {
            panic!("expected nearby");
        };
        assert_eq!(args.origin.origin_id, 42);
        assert_eq!(args.origin.origin_type, "charger");
        assert_eq!(args.target_type.as_deref(), Some("poi"));
    }

    #[test]
    fn isochrone_ranges_are_comma_separated() {
        let cli = Cli::try_parse_from([
            "pxm",
            "isochrone",
            "--origin-id",
            "7",
            "--origin-type",
            "poi",
            "--ranges",
            "300,600",
        ])
        .expect("cli should parse");

        let Commands::Isochrone(args) = cli.command else {
            panic!("expected isochrone");
        };
        assert_eq!(args.ranges, vec![300, 600]);
        assert!(args.profile.is_none());
    }

    #[test]
    fn origin_is_required() {
        assert!(Cli::try_parse_from(["pxm", "nearby", "--origin-type", "poi"]).is_err());
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        assert!(Cli::try_parse_from(["pxm", "--format", "xml", "queue", "stats"]).is_err());
    }

    #[test]
    fn database_override_is_global() {
        let cli = Cli::try_parse_from(["pxm", "cache", "purge", "--database", ":memory:"])
            .expect("cli should parse");
        assert_eq!(cli.global_flags().database.as_deref(), Some(":memory:"));
    }
}
