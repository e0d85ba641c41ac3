//! `courier history`: list or clear past attempts.

use anyhow::Result;

use crate::app::App;
use crate::terminal_output::{note_info, note_success, render_history};

pub async fn run(app: &App, clear: bool, limit: usize) -> Result<()> {
    let history = app.history();

    if clear {
        history.clear().await?;
        note_success("History cleared");
        return Ok(());
    }

    let records = history.recent(limit).await;
    if records.is_empty() {
        note_info("No history yet");
        return Ok(());
    }
    print!("{}", render_history(&records));
    Ok(())
}
