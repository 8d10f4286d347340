use anyhow::Context;
use chrono::Utc;
use prox_core::entities::EntityRef;
use prox_core::geo::Coordinates;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::EntityCommands;
use crate::commands::shared::parse::origin;
use crate::context::AppContext;
use crate::output::output;

#[derive(Serialize)]
struct Mutation {
    entity: EntityRef,
    changed: bool,
    /// Nearby recomputations enqueued for affected origins.
    enqueued: usize,
}

/// Handle `pxm entity`.
///
/// Mutations go through the same fan-out a content system would trigger.
pub async fn handle(
    action: &EntityCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        EntityCommands::Upsert {
            origin: args,
            name,
            lat,
            lng,
        } => {
            let entity = origin(args)?;
            let coordinates = match (lat, lng) {
                (Some(lat), Some(lng)) => Some(
                    Coordinates::new(*lat, *lng)
                        .with_context(|| format!("invalid coordinates {lat}, {lng}"))?,
                ),
                _ => None,
            };
            ctx.db
                .upsert_location(entity, coordinates, name, Utc::now())
                .await?;
            let enqueued = ctx
                .pipeline
                .queue
                .enqueue_affected(entity.id, entity.entity_type)
                .await?;
            output(
                &Mutation {
                    entity,
                    changed: true,
                    enqueued,
                },
                flags.format,
            )
        }
        EntityCommands::Remove { origin: args } => {
            let entity = origin(args)?;
            let changed = ctx.db.remove_location(entity).await?;
            let enqueued = ctx
                .pipeline
                .queue
                .enqueue_affected(entity.id, entity.entity_type)
                .await?;
            output(
                &Mutation {
                    entity,
                    changed,
                    enqueued,
                },
                flags.format,
            )
        }
        EntityCommands::Get { origin: args } => {
            let entity = origin(args)?;
            let location = ctx
                .db
                .get_location(entity)
                .await?
                .with_context(|| format!("{} {} not found", entity.entity_type, entity.id))?;
            output(&location, flags.format)
        }
    }
}
