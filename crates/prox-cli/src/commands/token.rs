use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::TokenCommands;
use crate::commands::shared::parse::origin;
use crate::context::AppContext;
use crate::output::output;

#[derive(Serialize)]
struct IssuedToken {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

/// Handle `pxm token`.
pub fn handle(action: &TokenCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        TokenCommands::Issue { origin: args } => {
            let origin = origin(args)?;
            let token = ctx.pipeline.on_demand.tokens().issue(origin, Utc::now())?;
            let expires_at = token
                .split_once('.')
                .and_then(|(expiry, _)| expiry.parse::<i64>().ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0));
            output(&IssuedToken { token, expires_at }, flags.format)
        }
    }
}
