use prox_core::entities::{EntityRef, NewTask};
use prox_core::enums::{TaskKind, TaskStatus};
use prox_db::repos::TaskFilter;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::QueueCommands;
use crate::commands::shared::parse::{origin, parse_enum, parse_opt_enum};
use crate::context::AppContext;
use crate::output::output;

#[derive(Serialize)]
struct Enqueued {
    entity: EntityRef,
    kind: TaskKind,
    task_id: i64,
    created: bool,
    /// Tasks created for affected origins, when `--affected` was given.
    affected_created: Option<usize>,
}

#[derive(Serialize)]
struct Requeued {
    requeued: u64,
}

/// Handle `pxm queue`.
pub async fn handle(
    action: &QueueCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let queue = &ctx.pipeline.queue;
    match action {
        QueueCommands::Stats => output(&queue.stats().await?, flags.format),
        QueueCommands::List { status, kind } => {
            let filter = TaskFilter {
                status: parse_opt_enum::<TaskStatus>(status.as_deref(), "status")?,
                kind: parse_opt_enum::<TaskKind>(kind.as_deref(), "kind")?,
                limit: Some(flags.limit.unwrap_or(50)),
            };
            output(&ctx.db.list_tasks(&filter).await?, flags.format)
        }
        QueueCommands::Enqueue {
            origin: args,
            kind,
            priority,
            affected,
        } => {
            let entity = origin(args)?;
            let kind: TaskKind = parse_enum(kind, "kind")?;
            let outcome = queue
                .enqueue_task(&NewTask::nearby(entity.id, entity.entity_type, *priority).with_kind(kind))
                .await?;
            let affected_created = if *affected {
                Some(queue.enqueue_affected(entity.id, entity.entity_type).await?)
            } else {
                None
            };
            output(
                &Enqueued {
                    entity,
                    kind,
                    task_id: outcome.task_id(),
                    created: outcome.is_created(),
                    affected_created,
                },
                flags.format,
            )
        }
        QueueCommands::RequeueFailed { kind } => {
            let kind = parse_opt_enum::<TaskKind>(kind.as_deref(), "kind")?;
            let requeued = queue.requeue_failed(kind).await?;
            output(&Requeued { requeued }, flags.format)
        }
        QueueCommands::Run { batch_size } => {
            let size = batch_size.unwrap_or(ctx.config.queue.batch_size);
            let report = ctx.pipeline.batch.process_batch(size).await?;
            output(&report, flags.format)
        }
    }
}
