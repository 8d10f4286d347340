use prox_core::entities::NewTask;
use prox_core::enums::TaskKind;
use prox_pipeline::discovery::DiscoveryOptions;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::DiscoverArgs;
use crate::commands::shared::parse::origin;
use crate::context::AppContext;
use crate::output::output;

#[derive(Serialize)]
struct Enqueued {
    task_id: i64,
    created: bool,
}

/// Handle `pxm discover`.
pub async fn handle(
    args: &DiscoverArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let entity = origin(&args.origin)?;
    let options = DiscoveryOptions {
        thorough: args.thorough,
        force: args.force,
    };

    if args.queue {
        let task = NewTask::nearby(entity.id, entity.entity_type, 0)
            .with_kind(TaskKind::Discovery)
            .with_payload(options.to_payload());
        let outcome = ctx.pipeline.queue.enqueue_task(&task).await?;
        return output(
            &Enqueued {
                task_id: outcome.task_id(),
                created: outcome.is_created(),
            },
            flags.format,
        );
    }

    let report = ctx.pipeline.discovery.discover(entity, options).await?;
    output(&report, flags.format)
}
