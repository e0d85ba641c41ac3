mod app;
mod cancel_cmd;
mod config_cmd;
mod history_cmd;
mod payload_args;
mod run_cmd;
mod schedule_cmd;
mod send_cmd;
mod status_cmd;
mod terminal_output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, error};

use app::App;
use payload_args::PayloadArgs;

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Courier: submit clinic appointments now or at a scheduled time")]
#[command(version)]
struct Cli {
    /// Config directory (defaults to $COURIER_CONFIG_DIR or ~/.courier)
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an appointment immediately
    Send {
        #[command(flatten)]
        payload: PayloadArgs,
    },
    /// Submit an appointment at a future time, retrying on failure
    Schedule {
        /// RFC 3339 time or local "YYYY-MM-DD HH:MM"
        #[arg(long)]
        at: String,
        /// Queue the submission and exit instead of waiting for it
        #[arg(long)]
        detach: bool,
        #[command(flatten)]
        payload: PayloadArgs,
    },
    /// Cancel the scheduled submission
    Cancel,
    /// Show the scheduled time and countdown status
    Status,
    /// Host a queued submission until it completes
    Run,
    /// List past submission attempts
    History {
        /// Remove all history entries
        #[arg(long)]
        clear: bool,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config
    Show,
    /// Write a default config file
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_dir = cli.config_dir.unwrap_or_else(courier_config::config_dir);

    // config commands must work even when the file is invalid
    if let Commands::Config { action } = &cli.command {
        return match action {
            ConfigAction::Show => config_cmd::show(&config_dir).await,
            ConfigAction::Init { force } => config_cmd::init(&config_dir, *force).await,
        };
    }

    let app = App::load(Some(config_dir)).await?;
    courier_logging::init_logger(app.log_dir(), &app.config.logging.level);
    debug!(data_dir = %app.data_dir.display(), "Courier starting");

    let result = match &cli.command {
        Commands::Send { payload } => send_cmd::run(&app, payload).await,
        Commands::Schedule { at, detach, payload } => {
            schedule_cmd::run(&app, at, payload, *detach).await
        }
        Commands::Cancel => cancel_cmd::run(&app).await,
        Commands::Status => status_cmd::run(&app).await,
        Commands::Run => run_cmd::run(&app).await,
        Commands::History { clear, limit } => history_cmd::run(&app, *clear, *limit).await,
        Commands::Config { .. } => Ok(()),
    };

    if let Err(e) = &result {
        error!(error = %e, "Command failed");
    }
    result
}
