use chrono::Utc;
use prox_core::entities::EntityRef;
use prox_pipeline::cache_policy::keys;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::CacheCommands;
use crate::commands::shared::parse::parse_enum;
use crate::context::AppContext;
use crate::output::output;

#[derive(Serialize)]
struct Deleted {
    pattern: Option<String>,
    deleted: u64,
}

/// Handle `pxm cache`.
pub async fn handle(
    action: &CacheCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let cache = &ctx.pipeline.cache;
    match action {
        CacheCommands::Invalidate {
            pattern,
            origin_id,
            origin_type,
        } => {
            let pattern = match (pattern, origin_id, origin_type) {
                (Some(pattern), _, _) => pattern.clone(),
                (None, Some(id), Some(ty)) => {
                    keys::nearby_origin_pattern(EntityRef::new(*id, parse_enum(ty, "origin type")?))
                }
                _ => anyhow::bail!("either --pattern or --origin-id with --origin-type is required"),
            };
            let deleted = cache.invalidate(&pattern).await?;
            output(
                &Deleted {
                    pattern: Some(pattern),
                    deleted,
                },
                flags.format,
            )
        }
        CacheCommands::Purge => {
            let deleted = cache.purge_expired(Utc::now()).await?;
            output(
                &Deleted {
                    pattern: None,
                    deleted,
                },
                flags.format,
            )
        }
    }
}
