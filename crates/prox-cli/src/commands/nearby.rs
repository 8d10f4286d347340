use prox_core::enums::EntityType;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::NearbyArgs;
use crate::commands::shared::parse::{origin, parse_opt_enum};
use crate::context::AppContext;
use crate::output::output;

/// Handle `pxm nearby`.
pub async fn handle(args: &NearbyArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let origin = origin(&args.origin)?;
    let target: Option<EntityType> = parse_opt_enum(args.target_type.as_deref(), "target type")?;
    let limit = flags.limit.map(usize::try_from).transpose()?;

    let outcome = ctx.pipeline.on_demand.nearby(origin, target, limit).await?;
    output(&outcome, flags.format)
}
