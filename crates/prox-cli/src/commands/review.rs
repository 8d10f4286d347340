use prox_core::entities::EntityRef;
use prox_core::enums::{EntityType, ReviewStatus};
use prox_db::repos::ReviewFilter;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::ReviewCommands;
use crate::commands::shared::parse::parse_enum;
use crate::context::AppContext;
use crate::output::output;

/// Handle `pxm review`.
pub async fn handle(
    action: &ReviewCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let discovery = &ctx.pipeline.discovery;
    match action {
        ReviewCommands::List {
            status,
            entity_id,
            entity_type,
        } => {
            let status = if status.eq_ignore_ascii_case("all") {
                None
            } else {
                Some(parse_enum::<ReviewStatus>(status, "status")?)
            };
            let entity = match (entity_id, entity_type) {
                (Some(id), Some(ty)) => Some(EntityRef::new(
                    *id,
                    parse_enum::<EntityType>(ty, "entity type")?,
                )),
                _ => None,
            };
            let filter = ReviewFilter {
                status,
                entity,
                limit: Some(flags.limit.unwrap_or(50)),
            };
            output(&discovery.reviews(&filter).await?, flags.format)
        }
        ReviewCommands::Resolve { id, decision } => {
            let decision: ReviewStatus = decision.parse()?;
            if decision == ReviewStatus::Pending {
                anyhow::bail!("decision must be approve or reject");
            }
            output(&discovery.resolve_review(*id, decision).await?, flags.format)
        }
        ReviewCommands::Stats => output(&discovery.review_stats().await?, flags.format),
    }
}
