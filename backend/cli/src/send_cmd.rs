//! `courier send`: post one appointment right away.

use anyhow::{bail, Result};
use chrono::Local;
use tracing::info;

use courier_core::Submitter;
use courier_scheduler::{classify, Classification};

use crate::app::App;
use crate::payload_args::PayloadArgs;
use crate::terminal_output::{note_error, note_success};

pub async fn run(app: &App, payload: &PayloadArgs) -> Result<()> {
    let today = Local::now().date_naive();
    let body = payload.resolve(&app.doctor(), today, today).await?;
    let client = app.client()?;

    info!(endpoint = client.endpoint(), "Sending appointment");
    let result = client.send(&body).await?;

    match classify(&result) {
        Classification::Success => {
            note_success("Appointment sent");
            println!("{result}");
            Ok(())
        }
        Classification::Error => {
            note_error(&result);
            bail!("Appointment was not sent");
        }
    }
}
