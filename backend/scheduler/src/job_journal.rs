/// Durable record of enqueued deferred jobs.
///
/// A JSON object keyed by unique job key, rewritten atomically on every
/// change. The job host replays it on startup so a pending submission
/// survives a process restart. It is also the authority on which run owns a
/// key: a job whose `run_id` is no longer journaled must not fire, whichever
/// process hosts it.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use courier_core::JobInput;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

pub const JOURNAL_FILE_NAME: &str = "pending_jobs.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    /// Identifies one enqueue; a replaced job gets a fresh id.
    pub run_id: Uuid,
    pub input: JobInput,
    pub fire_at: DateTime<FixedOffset>,
}

pub struct JobJournal {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JobJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(JOURNAL_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All journaled jobs. A missing or corrupt journal reads as empty.
    pub async fn load(&self) -> BTreeMap<String, JobRecord> {
        let _guard = self.lock.lock().await;
        self.read_unlocked().await
    }

    pub async fn upsert(&self, key: &str, record: JobRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut jobs = self.read_unlocked().await;
        jobs.insert(key.to_string(), record);
        self.write_unlocked(&jobs).await
    }

    /// Remove `key`. With `run_id`, only removes the entry if it still belongs
    /// to that run. Returns whether an entry was removed.
    pub async fn remove(&self, key: &str, run_id: Option<Uuid>) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut jobs = self.read_unlocked().await;
        let matches = match (jobs.get(key), run_id) {
            (Some(record), Some(id)) => record.run_id == id,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !matches {
            return Ok(false);
        }
        jobs.remove(key);
        self.write_unlocked(&jobs).await?;
        Ok(true)
    }

    /// Whether `key` is still journaled under `run_id`.
    ///
    /// An unreadable or corrupt journal cannot name another owner, so the
    /// run is treated as current.
    pub async fn is_current(&self, key: &str, run_id: Uuid) -> bool {
        let _guard = self.lock.lock().await;
        match self.try_read_unlocked().await {
            Ok(jobs) => jobs.get(key).is_some_and(|record| record.run_id == run_id),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Job journal unreadable, assuming run is current");
                true
            }
        }
    }

    /// Take over the entry under `key` by giving it a fresh run id, provided
    /// it still belongs to `run_id`. Any other host still holding the old id
    /// stands down. Returns the claimed record, or `None` if the entry moved on.
    pub async fn claim(&self, key: &str, run_id: Uuid) -> Result<Option<JobRecord>> {
        let _guard = self.lock.lock().await;
        let mut jobs = self.read_unlocked().await;
        let Some(record) = jobs.get_mut(key).filter(|record| record.run_id == run_id) else {
            return Ok(None);
        };
        record.run_id = Uuid::new_v4();
        let claimed = record.clone();
        self.write_unlocked(&jobs).await?;
        Ok(Some(claimed))
    }

    async fn read_unlocked(&self) -> BTreeMap<String, JobRecord> {
        self.try_read_unlocked().await.unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Ignoring unusable job journal");
            BTreeMap::new()
        })
    }

    async fn try_read_unlocked(&self) -> Result<BTreeMap<String, JobRecord>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).with_context(|| format!("Corrupt job journal {}", self.path.display()))
    }

    async fn write_unlocked(&self, jobs: &BTreeMap<String, JobRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(jobs).context("Failed to serialize job journal")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        debug!(path = %self.path.display(), jobs = jobs.len(), "Wrote job journal");
        Ok(())
    }
}
