//! `courier config`: show or initialise the config file.

use std::path::Path;

use anyhow::{Context, Result};

use courier_config::{config_file_path, load_and_prepare, write_config, CourierConfig};

use crate::terminal_output::{note_info, note_success, DIM, RESET};

pub async fn show(config_dir: &Path) -> Result<()> {
    let path = config_file_path(config_dir);
    let config = load_and_prepare(&path).await?;
    let yaml = serde_yaml::to_string(&config).context("Failed to render config")?;
    println!("{DIM}# {}{RESET}", path.display());
    print!("{yaml}");
    Ok(())
}

pub async fn init(config_dir: &Path, force: bool) -> Result<()> {
    let path = config_file_path(config_dir);
    if path.exists() && !force {
        note_info(&format!("{} already exists (use --force to overwrite)", path.display()));
        return Ok(());
    }
    write_config(&CourierConfig::default(), &path).await?;
    note_success(&format!("Wrote {}", path.display()));
    Ok(())
}
