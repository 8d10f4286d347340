use anyhow::Context;
use tokio::sync::watch;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ServeArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `pxm serve`: run the scheduler until Ctrl-C.
pub async fn handle(args: &ServeArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let scheduler = ctx.pipeline.scheduler();
    if args.once {
        let report = scheduler.sweep().await?;
        tracing::info!(?report, "single sweep finished");
        return output(&report, flags.format);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("shutdown requested");
    // The receiver lives in the worker; a send error means it already stopped.
    let _ = shutdown_tx.send(true);
    worker.await.context("scheduler task panicked")?;
    Ok(())
}
