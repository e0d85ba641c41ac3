//! `courier status`: countdown state of the saved schedule.

use anyhow::Result;

use courier_core::{Clock, SystemClock, UNIQUE_JOB_KEY};
use courier_scheduler::countdown::describe;

use crate::app::App;
use crate::terminal_output::{BOLD, RESET};

pub async fn run(app: &App) -> Result<()> {
    let saved = app.store().read().await;
    let snapshot = describe(saved.as_deref(), SystemClock.now());
    let queued = app.journal().load().await.contains_key(UNIQUE_JOB_KEY);

    println!("{BOLD}Schedule{RESET}");
    println!("  Saved time:  {}", saved.as_deref().unwrap_or("-"));
    println!("  Status:      {}", snapshot.label());
    println!("  Queued job:  {}", if queued { "yes" } else { "no" });
    println!("  Endpoint:    {}", app.config.endpoint.url);
    Ok(())
}
