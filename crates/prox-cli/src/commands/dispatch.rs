use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Nearby(args) => commands::nearby::handle(&args, ctx, flags).await,
        Commands::Isochrone(args) => commands::isochrone::handle(&args, ctx, flags).await,
        Commands::Process(args) => commands::process::handle(&args, ctx, flags).await,
        Commands::Token { action } => commands::token::handle(&action, ctx, flags),
        Commands::Discover(args) => commands::discover::handle(&args, ctx, flags).await,
        Commands::Review { action } => commands::review::handle(&action, ctx, flags).await,
        Commands::Queue { action } => commands::queue::handle(&action, ctx, flags).await,
        Commands::Cache { action } => commands::cache::handle(&action, ctx, flags).await,
        Commands::Geocode(args) => commands::geocode::handle_geocode(&args, ctx, flags).await,
        Commands::Reverse(args) => commands::geocode::handle_reverse(&args, ctx, flags).await,
        Commands::Serve(args) => commands::serve::handle(&args, ctx, flags).await,
        Commands::Entity { action } => commands::entity::handle(&action, ctx, flags).await,
    }
}
