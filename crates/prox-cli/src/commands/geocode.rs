use anyhow::Context;
use prox_core::enums::ProviderId;
use prox_core::geo::Coordinates;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::{GeocodeArgs, ReverseArgs};
use crate::commands::shared::parse::parse_opt_enum;
use crate::context::AppContext;
use crate::output::output;

/// Handle `pxm geocode`.
pub async fn handle_geocode(
    args: &GeocodeArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let provider: Option<ProviderId> = parse_opt_enum(args.provider.as_deref(), "provider")?;
    let limit = usize::try_from(flags.limit.unwrap_or(5))?;
    let results = ctx
        .pipeline
        .geocoder
        .geocode(provider, &args.query, limit)
        .await?;
    output(&results, flags.format)
}

/// Handle `pxm reverse`.
pub async fn handle_reverse(
    args: &ReverseArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let provider: Option<ProviderId> = parse_opt_enum(args.provider.as_deref(), "provider")?;
    let at = Coordinates::new(args.lat, args.lng)
        .with_context(|| format!("invalid coordinates {}, {}", args.lat, args.lng))?;
    let hit = ctx.pipeline.geocoder.reverse(provider, at).await?;
    output(&hit, flags.format)
}
