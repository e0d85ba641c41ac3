//! `courier run`: host the queued submission in the foreground.

use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use courier_core::{Notifier, UNIQUE_JOB_KEY};
use courier_scheduler::{CountdownNotifier, JobCompletion, Scheduler, WorkOutcome};

use crate::app::App;
use crate::terminal_output::{note_info, note_success, note_warn, ConsoleNotifier};

pub async fn run(app: &App) -> Result<()> {
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier::default());
    let scheduler = app.scheduler(notifier.clone())?;
    let completions = scheduler.host().subscribe();

    if scheduler.restore().await == 0 {
        note_info("No queued submission");
        return Ok(());
    }
    note_info("Resumed queued submission");
    host_until_done(&scheduler, notifier, completions).await
}

/// Show the countdown and wait for the unique job to finish or Ctrl-C.
///
/// On Ctrl-C the job stays in the journal for a later `courier run`.
pub async fn host_until_done(
    scheduler: &Scheduler,
    notifier: Arc<dyn Notifier>,
    mut completions: broadcast::Receiver<JobCompletion>,
) -> Result<()> {
    let stop_countdown = CancellationToken::new();
    let countdown = match scheduler.store().read().await {
        Some(iso) => match CountdownNotifier::from_iso(&iso, notifier) {
            Ok(countdown) => {
                let token = stop_countdown.clone();
                Some(tokio::spawn(async move { countdown.run(token, |_| {}).await }))
            }
            Err(e) => {
                warn!(error = %e, "Saved schedule unreadable, countdown disabled");
                None
            }
        },
        None => None,
    };

    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                note_warn("Interrupted; the submission stays queued for `courier run`");
                scheduler.host().shutdown().await;
                break None;
            }
            completion = completions.recv() => match completion {
                // A cancelled run that left nothing pending was replaced or
                // cancelled from another process.
                Ok(done) if done.key == UNIQUE_JOB_KEY => {
                    if done.outcome.is_terminal() || !scheduler.is_pending().await {
                        break Some(done.outcome);
                    }
                    debug!(run_id = %done.run_id, "Replaced run finished");
                }
                Ok(done) => debug!(key = %done.key, outcome = ?done.outcome, "Ignoring completion"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed job completions"),
                Err(RecvError::Closed) => break None,
            },
        }
    };

    stop_countdown.cancel();
    if let Some(handle) = countdown {
        let _ = handle.await;
    }

    match outcome {
        Some(WorkOutcome::Success { attempts, response }) => {
            note_success(&format!("Submitted after {attempts} attempt(s)"));
            println!("{response}");
            Ok(())
        }
        Some(WorkOutcome::Failure { attempts, last_error }) => {
            bail!("Submission failed after {attempts} attempt(s): {last_error}")
        }
        Some(WorkOutcome::Cancelled { .. }) => {
            note_info("Submission was cancelled or taken over by another `courier` process");
            Ok(())
        }
        None => Ok(()),
    }
}
