use crate::cli::GlobalFlags;
use crate::cli::root_commands::ProcessArgs;
use crate::commands::shared::parse::origin;
use crate::context::AppContext;
use crate::output::output;

/// Handle `pxm process`.
pub async fn handle(
    args: &ProcessArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let origin = origin(&args.origin)?;
    let outcome = ctx.pipeline.on_demand.process(origin, &args.token).await?;
    output(&outcome, flags.format)
}
