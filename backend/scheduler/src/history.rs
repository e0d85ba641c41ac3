/// Append-only history of submission attempts.
///
/// One record per line, four fields joined by `" | "`: timestamp, status code
/// or `ERROR`, response or error text, raw payload. Every attempt is recorded
/// here whether it came from an immediate send or a deferred job.
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use courier_core::{HistoryEntry, HistoryRecord, PayloadSummary};
use tokio::fs;
use tracing::{debug, warn};

pub const HISTORY_FILE_NAME: &str = "history.jsonl";
pub const FIELD_SEPARATOR: &str = " | ";

#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(HISTORY_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single append-mode write.
    pub async fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let mut line = format_line(entry);
        line.push('\n');
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            file.write_all(line.as_bytes())
                .with_context(|| format!("Failed to append to {}", path.display()))?;
            Ok(())
        })
        .await
        .context("History append task failed")??;

        debug!(status = %entry.outcome, "Appended history entry");
        Ok(())
    }

    /// All records, most recent first. Read failures yield an empty list.
    pub async fn read(&self) -> Vec<HistoryRecord> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read history");
                return Vec::new();
            }
        };

        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .rev()
            .enumerate()
            .map(|(id, line)| parse_line(line, id))
            .collect()
    }

    /// The `limit` most recent records.
    pub async fn recent(&self, limit: usize) -> Vec<HistoryRecord> {
        let mut records = self.read().await;
        records.truncate(limit);
        records
    }

    /// Truncate the whole log.
    pub async fn clear(&self) -> Result<()> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(());
        }
        fs::write(&self.path, b"")
            .await
            .with_context(|| format!("Failed to clear {}", self.path.display()))?;
        debug!(path = %self.path.display(), "Cleared history");
        Ok(())
    }
}

/// Flatten a field so it cannot break the line or field structure.
pub fn sanitize_field(value: &str) -> String {
    let mut field = value.replace("\r\n", " ").replace(['\n', '\r'], " ");
    while field.contains(FIELD_SEPARATOR) {
        field = field.replace(FIELD_SEPARATOR, " ");
    }
    // a trailing " |" would merge with the following separator
    if field.ends_with(" |") {
        field.pop();
        field.push(' ');
    }
    field
}

pub fn format_line(entry: &HistoryEntry) -> String {
    [
        entry.timestamp_text(),
        entry.outcome.to_string(),
        sanitize_field(entry.text()),
        sanitize_field(&entry.raw_payload),
    ]
    .join(FIELD_SEPARATOR)
}

/// Parse one line; missing fields come back empty rather than failing.
pub fn parse_line(line: &str, id: usize) -> HistoryRecord {
    let mut parts = line.splitn(4, FIELD_SEPARATOR);
    let mut next = || parts.next().unwrap_or_default().to_string();
    let timestamp = next();
    let status = next();
    let response_body = next();
    let raw_payload = next();
    let details = PayloadSummary::parse(&raw_payload);

    HistoryRecord {
        id,
        timestamp,
        status,
        response_body,
        raw_payload,
        details,
    }
}
