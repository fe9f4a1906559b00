use std::{path::Path, sync::Arc};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    config::Settings,
    context::JournalContext,
    journal::orchestrator::RunOptions,
    utils::clock::{Clock, DefaultClock},
};

pub mod args;
pub mod schedule;
pub mod shutdown;

use schedule::Scheduler;

/// Represents the starting point for scheduled mode. Runs until Ctrl-C or termination.
pub async fn start_daemon(config_path: &Path) -> Result<()> {
    let settings = Settings::load(config_path)?;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let ctx = JournalContext::from_settings(settings, clock.clone())?;
    let time = ctx.settings.schedule_time()?;
    info!("Scheduled daily pass at {time} ({:?})", ctx.zone);

    let shutdown_token = CancellationToken::new();
    let scheduler = Scheduler::new(time, ctx.zone, clock, shutdown_token.clone());
    let ctx = &ctx;

    tokio::join!(shutdown::detect_shutdown(shutdown_token.clone()), async {
        scheduler
            .run(move |now| async move {
                // Every failure is already logged with context, the schedule keeps going.
                if let Err(e) = ctx
                    .daily_pass(now.date_naive(), now, RunOptions::default(), true)
                    .await
                {
                    error!("Scheduled pass failed: {e}");
                }
            })
            .await;
        shutdown_token.cancel();
    });
    Ok(())
}
