//! Single-slot durable copy of the pending schedule time.
//!
//! Clones share one lock, so a conditional clear cannot interleave with a
//! save made through another clone.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const SCHEDULE_FILE_NAME: &str = "one_time_schedule.txt";

#[derive(Debug, Clone)]
pub struct ScheduleStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl ScheduleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SCHEDULE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the slot with `iso` (temp file + rename).
    pub async fn save(&self, iso: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let tmp = self.path.with_extension("txt.tmp");
        fs::write(&tmp, iso.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        debug!(path = %self.path.display(), iso, "Saved schedule");
        Ok(())
    }

    /// The saved timestamp, or `None` when missing, blank, or unreadable.
    pub async fn read(&self) -> Option<String> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => {
                let iso = raw.trim();
                (!iso.is_empty()).then(|| iso.to_string())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read schedule");
                None
            }
        }
    }

    /// Empty the slot. A missing file is already clear.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.clear_unlocked().await
    }

    /// Empty the slot only while it still holds `iso`, as one step against
    /// saves made through this store. Returns whether the slot was cleared.
    pub async fn clear_if(&self, iso: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        if self.read().await.as_deref() != Some(iso) {
            return Ok(false);
        }
        self.clear_unlocked().await?;
        Ok(true)
    }

    async fn clear_unlocked(&self) -> Result<()> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(());
        }
        fs::write(&self.path, b"")
            .await
            .with_context(|| format!("Failed to clear {}", self.path.display()))?;
        debug!(path = %self.path.display(), "Cleared schedule");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_read_clear_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScheduleStore::in_dir(dir.path());

        assert_eq!(store.read().await, None);

        store.save("2026-10-19T08:05:00+06:00").await.unwrap();
        assert_eq!(store.read().await.as_deref(), Some("2026-10-19T08:05:00+06:00"));

        store.save("2026-10-20T09:00:00+06:00").await.unwrap();
        assert_eq!(store.read().await.as_deref(), Some("2026-10-20T09:00:00+06:00"));

        store.clear().await.unwrap();
        assert_eq!(store.read().await, None);
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn blank_or_unreadable_slot_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScheduleStore::in_dir(dir.path());
        tokio::fs::write(store.path(), "  \n").await.unwrap();
        assert_eq!(store.read().await, None);

        // a directory where the file should be cannot be read
        let broken = ScheduleStore::new(dir.path());
        assert_eq!(broken.read().await, None);
    }

    #[tokio::test]
    async fn clear_if_only_clears_the_named_time() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScheduleStore::in_dir(dir.path());
        store.save("2026-10-20T09:00:00+06:00").await.unwrap();

        assert!(!store.clear_if("2026-10-19T08:05:00+06:00").await.unwrap());
        assert_eq!(store.read().await.as_deref(), Some("2026-10-20T09:00:00+06:00"));

        assert!(store.clear_if("2026-10-20T09:00:00+06:00").await.unwrap());
        assert_eq!(store.read().await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn clear_if_never_wipes_a_concurrent_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScheduleStore::in_dir(dir.path());
        let old = "2026-10-19T08:05:00+06:00";
        let new = "2026-10-20T09:00:00+06:00";

        for _ in 0..50 {
            store.save(old).await.unwrap();
            let finisher = store.clone();
            let scheduler = store.clone();
            let (cleared, saved) = tokio::join!(
                tokio::spawn(async move { finisher.clear_if(old).await }),
                tokio::spawn(async move { scheduler.save(new).await }),
            );
            cleared.unwrap().unwrap();
            saved.unwrap().unwrap();
            assert_eq!(store.read().await.as_deref(), Some(new));
        }
    }

    #[tokio::test]
    async fn clear_without_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScheduleStore::in_dir(&dir.path().join("nested"));
        store.clear().await.unwrap();
        assert!(!store.path().exists());
    }
}
