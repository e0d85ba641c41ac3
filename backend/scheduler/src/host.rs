//! Deferred job host: unique-key jobs that fire once after a delay.
//!
//! Each job runs as its own tokio task guarded by a `CancellationToken`.
//! Enqueued jobs are written to the [`JobJournal`] so [`JobHost::restore`]
//! can re-arm them after a restart.
//!
//! Several hosts may share one journal (one per process). The journal decides
//! which run owns a key: a job checks it before firing and after every
//! backoff, and stands down as `Cancelled` once its run id is gone.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use courier_core::{Clock, JobInput, SystemClock};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::job_journal::{JobJournal, JobRecord};
use crate::schedule_store::ScheduleStore;
use crate::worker::{RunGuard, SubmissionWorker, WorkOutcome};

/// What to do when a job with the same key is already enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Cancel the existing job and enqueue the new one.
    Replace,
    /// Leave the existing job alone and drop the new one.
    Keep,
}

/// Broadcast when a job task ends, however it ended.
#[derive(Debug, Clone)]
pub struct JobCompletion {
    pub key: String,
    pub run_id: Uuid,
    pub input: JobInput,
    pub outcome: WorkOutcome,
}

struct ActiveJob {
    run_id: Uuid,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Shared {
    worker: Arc<SubmissionWorker>,
    journal: JobJournal,
    jobs: Mutex<HashMap<String, ActiveJob>>,
    schedule_store: Option<ScheduleStore>,
    completions: broadcast::Sender<JobCompletion>,
}

pub struct JobHost {
    shared: Arc<Shared>,
    clock: Arc<dyn Clock>,
}

impl JobHost {
    pub fn new(worker: Arc<SubmissionWorker>, journal: JobJournal) -> Self {
        let (completions, _) = broadcast::channel(16);
        Self {
            shared: Arc::new(Shared {
                worker,
                journal,
                jobs: Mutex::new(HashMap::new()),
                schedule_store: None,
                completions,
            }),
            clock: Arc::new(SystemClock),
        }
    }

    /// Store to clear when a job finishes while it still names that job.
    /// Must be set before any job is enqueued.
    pub fn with_schedule_store(mut self, store: ScheduleStore) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.schedule_store = Some(store);
        } else {
            warn!("Job host already shared, schedule store not attached");
        }
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobCompletion> {
        self.shared.completions.subscribe()
    }

    /// Enqueue a one-shot job under `key` to fire at `fire_at`.
    ///
    /// Returns the new run id, or `None` when `Keep` left an existing job in
    /// place.
    pub async fn enqueue_unique(
        &self,
        key: &str,
        fire_at: DateTime<FixedOffset>,
        input: JobInput,
        policy: ConflictPolicy,
    ) -> Result<Option<Uuid>> {
        let mut jobs = self.shared.jobs.lock().await;

        if policy == ConflictPolicy::Keep {
            if let Some(existing) = jobs.get(key).filter(|job| !job.handle.is_finished()) {
                debug!(key, run_id = %existing.run_id, "Job already enqueued, keeping it");
                return Ok(None);
            }
        }

        let record = JobRecord {
            run_id: Uuid::new_v4(),
            input,
            fire_at,
        };
        // The previous job keeps running if the journal write fails.
        self.shared.journal.upsert(key, record.clone()).await?;

        if let Some(existing) = jobs.remove(key) {
            if !existing.handle.is_finished() {
                info!(key, run_id = %existing.run_id, "Replacing enqueued job");
                existing.cancel.cancel();
            }
        }

        let run_id = record.run_id;
        let delay = self.delay_until(fire_at);
        let job = spawn_job(self.shared.clone(), key.to_string(), record, delay);
        jobs.insert(key.to_string(), job);

        info!(key, %run_id, delay_secs = delay.as_secs(), "Enqueued job");
        Ok(Some(run_id))
    }

    /// Cancel the job under `key`, if any, and drop it from the journal.
    pub async fn cancel_unique(&self, key: &str) -> Result<bool> {
        let active = self.shared.jobs.lock().await.remove(key);
        let was_active = match active {
            Some(job) => {
                job.cancel.cancel();
                !job.handle.is_finished()
            }
            None => false,
        };
        let was_journaled = self.shared.journal.remove(key, None).await?;
        if was_active || was_journaled {
            info!(key, "Cancelled job");
        }
        Ok(was_active || was_journaled)
    }

    pub async fn is_pending(&self, key: &str) -> bool {
        self.shared
            .jobs
            .lock()
            .await
            .get(key)
            .is_some_and(|job| !job.handle.is_finished())
    }

    /// Re-arm journaled jobs that are not already running here. Each one is
    /// claimed under a fresh run id, so a host elsewhere still holding it
    /// stands down. Overdue jobs fire immediately. Returns the number of jobs
    /// restored.
    pub async fn restore(&self) -> usize {
        let records = self.shared.journal.load().await;
        let mut jobs = self.shared.jobs.lock().await;
        let mut restored = 0;

        for (key, record) in records {
            if jobs.get(&key).is_some_and(|job| !job.handle.is_finished()) {
                continue;
            }
            let record = match self.shared.journal.claim(&key, record.run_id).await {
                Ok(Some(claimed)) => claimed,
                Ok(None) => {
                    debug!(key = %key, "Journal entry changed while restoring, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to claim journaled job, restoring as is");
                    record
                }
            };
            let delay = self.delay_until(record.fire_at);
            info!(key = %key, run_id = %record.run_id, delay_secs = delay.as_secs(), "Restoring job");
            let job = spawn_job(self.shared.clone(), key.clone(), record, delay);
            jobs.insert(key, job);
            restored += 1;
        }
        restored
    }

    /// Stop every in-memory job. Journal entries are kept, so the jobs come
    /// back on the next `restore`.
    pub async fn shutdown(&self) {
        let jobs = std::mem::take(&mut *self.shared.jobs.lock().await);
        for (key, job) in jobs {
            debug!(key = %key, "Stopping job");
            job.cancel.cancel();
            if let Err(e) = job.handle.await {
                warn!(key = %key, error = %e, "Job task did not stop cleanly");
            }
        }
    }

    fn delay_until(&self, fire_at: DateTime<FixedOffset>) -> Duration {
        (fire_at - self.clock.now()).to_std().unwrap_or(Duration::ZERO)
    }
}

fn spawn_job(shared: Arc<Shared>, key: String, record: JobRecord, delay: Duration) -> ActiveJob {
    let cancel = CancellationToken::new();
    let run_id = record.run_id;
    let token = cancel.clone();

    let handle = tokio::spawn(async move {
        let outcome = tokio::select! {
            _ = token.cancelled() => WorkOutcome::Cancelled { attempts: 0 },
            _ = tokio::time::sleep(delay) => {
                let guard = JournalGuard {
                    journal: &shared.journal,
                    key: &key,
                    run_id,
                };
                if guard.still_current().await {
                    debug!(key = %key, %run_id, "Job fired");
                    shared.worker.run_guarded(record.input.clone(), token.clone(), &guard).await
                } else {
                    info!(key = %key, %run_id, "Job replaced or cancelled elsewhere, not firing");
                    WorkOutcome::Cancelled { attempts: 0 }
                }
            }
        };
        finish_job(&shared, key, record, outcome).await;
    });

    ActiveJob {
        run_id,
        cancel,
        handle,
    }
}

/// Ownership check backed by the shared journal.
struct JournalGuard<'a> {
    journal: &'a JobJournal,
    key: &'a str,
    run_id: Uuid,
}

#[async_trait]
impl RunGuard for JournalGuard<'_> {
    async fn still_current(&self) -> bool {
        self.journal.is_current(self.key, self.run_id).await
    }
}

async fn finish_job(shared: &Shared, key: String, record: JobRecord, outcome: WorkOutcome) {
    let current = {
        let mut jobs = shared.jobs.lock().await;
        let current = jobs.get(&key).is_some_and(|job| job.run_id == record.run_id);
        if current {
            jobs.remove(&key);
        }
        current
    };

    if current && outcome.is_terminal() {
        if let Err(e) = shared.journal.remove(&key, Some(record.run_id)).await {
            warn!(key = %key, error = %e, "Failed to drop finished job from journal");
        }
        if let Some(store) = &shared.schedule_store {
            if let Err(e) = store.clear_if(&record.input.scheduled_iso).await {
                warn!(error = %e, "Failed to clear finished schedule");
            }
        }
    }

    debug!(key = %key, run_id = %record.run_id, ?outcome, "Job finished");
    let _ = shared.completions.send(JobCompletion {
        key,
        run_id: record.run_id,
        input: record.input,
        outcome,
    });
}
