//! `courier schedule`: queue a submission for a future time.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};

use courier_core::{CourierError, Notifier};

use crate::app::App;
use crate::payload_args::PayloadArgs;
use crate::run_cmd::host_until_done;
use crate::terminal_output::{note_error, note_info, note_success, ConsoleNotifier};

const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

pub async fn run(app: &App, at: &str, payload: &PayloadArgs, detach: bool) -> Result<()> {
    let target = parse_target(at, &Local)?;
    let today = Local::now().date_naive();
    let body = payload.resolve(&app.doctor(), target.date_naive(), today).await?;

    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier::default());
    let scheduler = app.scheduler(notifier.clone())?;
    let completions = scheduler.host().subscribe();

    let submission = match scheduler.schedule_at(target, body).await {
        Ok(submission) => submission,
        Err(e @ CourierError::InPast { .. }) => {
            note_error(&e.to_string());
            return Err(e.into());
        }
        Err(e) => return Err(e).context("Failed to schedule appointment"),
    };
    note_success(&format!("Scheduled for {}", submission.target_iso()));

    if detach {
        scheduler.host().shutdown().await;
        note_info("Queued; start `courier run` to host it");
        return Ok(());
    }
    host_until_done(&scheduler, notifier, completions).await
}

/// RFC 3339, or a local `YYYY-MM-DD HH:MM[:SS]` in `tz`.
pub fn parse_target<Tz: TimeZone>(input: &str, tz: &Tz) -> Result<DateTime<FixedOffset>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt);
    }
    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.fixed_offset())
                .ok_or_else(|| anyhow!("{input} does not exist in the local time zone"));
        }
    }
    Err(anyhow!(
        "Unrecognized time {input:?}; use RFC 3339 or \"YYYY-MM-DD HH:MM\""
    ))
}
