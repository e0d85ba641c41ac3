//! `courier cancel`: drop the queued submission and the saved schedule time.

use anyhow::Result;
use tracing::warn;

use courier_scheduler::TracingNotifier;

use crate::app::App;
use crate::terminal_output::{note_info, note_success};

pub async fn run(app: &App) -> Result<()> {
    let scheduler = app.scheduler(std::sync::Arc::new(TracingNotifier))?;
    let cancelled = scheduler.cancel().await?;

    if let Err(e) = scheduler.store().clear().await {
        warn!(error = %e, "Failed to clear saved schedule");
    }

    if cancelled {
        note_success("Scheduled appointment cancelled");
    } else {
        note_info("Nothing was scheduled");
    }
    Ok(())
}
