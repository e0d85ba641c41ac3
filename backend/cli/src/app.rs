use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use courier_config::{config_dir, config_file_path, load_and_prepare, CourierConfig};
use courier_core::{DoctorDefaults, Notifier};
use courier_scheduler::{
    HistoryLog, JobHost, JobJournal, NetworkClient, RetryPolicy, ScheduleStore, Scheduler,
    SubmissionWorker,
};

/// Effective configuration plus the paths derived from it.
pub struct App {
    pub config: CourierConfig,
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl App {
    pub async fn load(config_dir_override: Option<PathBuf>) -> Result<Self> {
        let config_dir = config_dir_override.unwrap_or_else(config_dir);
        let config = load_and_prepare(&config_file_path(&config_dir)).await?;
        let data_dir = config.data_dir(&config_dir);
        Ok(Self {
            config,
            config_dir,
            data_dir,
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.config.log_dir(&self.config_dir)
    }

    pub fn history(&self) -> HistoryLog {
        HistoryLog::in_dir(&self.data_dir)
    }

    pub fn store(&self) -> ScheduleStore {
        ScheduleStore::in_dir(&self.data_dir)
    }

    pub fn journal(&self) -> JobJournal {
        JobJournal::in_dir(&self.data_dir)
    }

    pub fn doctor(&self) -> DoctorDefaults {
        DoctorDefaults {
            dr_code: self.config.defaults.dr_code.clone(),
            dr_name: self.config.defaults.dr_name.clone(),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.config.retry.max_retries,
            backoff_ms: self.config.retry.backoff_secs.saturating_mul(1000),
        }
    }

    pub fn client(&self) -> Result<NetworkClient> {
        NetworkClient::with_timeout(
            self.config.endpoint.url.clone(),
            Duration::from_secs(self.config.endpoint.timeout_secs),
            Arc::new(self.history()),
        )
        .context("Failed to create network client")
    }

    /// Scheduler wired to the real network client and the data directory.
    pub fn scheduler(&self, notifier: Arc<dyn Notifier>) -> Result<Scheduler> {
        let worker = SubmissionWorker::new(Arc::new(self.client()?), notifier)
            .with_policy(self.policy())
            .with_doctor(self.doctor());
        let store = self.store();
        let host = JobHost::new(Arc::new(worker), self.journal()).with_schedule_store(store.clone());
        Ok(Scheduler::new(Arc::new(host), store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn data_paths_follow_config() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("state");
        tokio::fs::write(
            config_file_path(dir.path()),
            format!(
                "storage:\n  dataDir: {}\nretry:\n  maxRetries: 1\n  backoffSecs: 5\ndefaults:\n  drCode: \"D42\"\n  drName: Dr. Karim\n",
                data.display()
            ),
        )
        .await
        .unwrap();

        let app = App::load(Some(dir.path().to_path_buf())).await.unwrap();
        assert_eq!(app.data_dir, data);
        assert_eq!(app.history().path(), data.join("history.jsonl"));
        assert_eq!(app.store().path(), data.join("one_time_schedule.txt"));
        assert_eq!(
            app.policy(),
            RetryPolicy {
                max_retries: 1,
                backoff_ms: 5_000
            }
        );
        assert_eq!(app.doctor().dr_code, "D42");
        assert_eq!(app.log_dir(), dir.path().join("logs"));
    }
}
