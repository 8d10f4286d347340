use prox_pipeline::isochrone::IsochroneRequest;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::IsochroneArgs;
use crate::commands::shared::parse::origin;
use crate::context::AppContext;
use crate::output::output;

/// Handle `pxm isochrone`.
pub async fn handle(
    args: &IsochroneArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let origin = origin(&args.origin)?;
    let request = if args.profile.is_none() && args.ranges.is_empty() {
        None
    } else {
        let defaults = &ctx.config.providers.isochrone;
        let profile = args.profile.clone().unwrap_or_else(|| defaults.profile.clone());
        let ranges = if args.ranges.is_empty() {
            defaults.ranges.clone()
        } else {
            args.ranges.clone()
        };
        Some(IsochroneRequest::new(profile, ranges)?)
    };

    let outcome = ctx.pipeline.on_demand.isochrone(origin, request).await?;
    output(&outcome, flags.format)
}
