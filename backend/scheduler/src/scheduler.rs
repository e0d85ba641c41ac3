use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use courier_core::{Clock, CourierError, ScheduledSubmission, SystemClock, UNIQUE_JOB_KEY};
use courier_logging::{EventLogger, SubmissionEvent};
use tracing::{info, warn};

use crate::countdown::{describe, CountdownSnapshot};
use crate::host::{ConflictPolicy, JobHost};
use crate::schedule_store::ScheduleStore;

/// Accepts future submissions and keeps at most one of them outstanding.
pub struct Scheduler {
    host: Arc<JobHost>,
    store: ScheduleStore,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(host: Arc<JobHost>, store: ScheduleStore) -> Self {
        Self {
            host,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &ScheduleStore {
        &self.store
    }

    pub fn host(&self) -> &Arc<JobHost> {
        &self.host
    }

    /// Schedule `payload` for `target`, replacing any outstanding submission.
    ///
    /// A target that is not in the future is rejected and nothing changes.
    pub async fn schedule_at(
        &self,
        target: DateTime<FixedOffset>,
        payload: impl Into<String>,
    ) -> Result<ScheduledSubmission, CourierError> {
        let submission = match ScheduledSubmission::new(target, payload, self.clock.now()) {
            Ok(submission) => submission,
            Err(e) => {
                warn!(error = %e, "Rejected schedule request");
                return Err(e);
            }
        };
        let iso = submission.target_iso();

        self.host
            .enqueue_unique(
                UNIQUE_JOB_KEY,
                submission.target,
                submission.to_job_input(),
                ConflictPolicy::Replace,
            )
            .await?;

        if let Err(e) = self.store.save(&iso).await {
            warn!(error = %e, "Failed to persist schedule time");
        }

        info!(target = %iso, "Scheduled appointment submission");
        EventLogger::log_event(UNIQUE_JOB_KEY, SubmissionEvent::Scheduled { target: iso });
        Ok(submission)
    }

    /// Cancel the outstanding submission. The saved schedule time is left in
    /// place.
    pub async fn cancel(&self) -> Result<bool, CourierError> {
        let cancelled = self.host.cancel_unique(UNIQUE_JOB_KEY).await?;
        if cancelled {
            EventLogger::log_event(
                UNIQUE_JOB_KEY,
                SubmissionEvent::Cancelled {
                    reason: "cancelled on request".to_string(),
                },
            );
        }
        Ok(cancelled)
    }

    /// Re-arm a submission that was outstanding when the process stopped.
    pub async fn restore(&self) -> usize {
        self.host.restore().await
    }

    pub async fn is_pending(&self) -> bool {
        self.host.is_pending(UNIQUE_JOB_KEY).await
    }

    /// Countdown state of the saved schedule time.
    pub async fn snapshot(&self) -> CountdownSnapshot {
        let saved = self.store.read().await;
        describe(saved.as_deref(), self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countdown::CountdownStatus;
    use crate::history::HistoryLog;
    use crate::job_journal::JobJournal;
    use crate::testing::{PausedClock, RecordingNotifier, ScriptedSubmitter};
    use crate::worker::{SubmissionWorker, WorkOutcome};
    use std::path::Path;
    use std::time::Duration;

    const NOW: &str = "2026-10-19T08:00:00+06:00";

    fn build(
        dir: &Path,
        submitter: Arc<ScriptedSubmitter>,
        notifier: Arc<RecordingNotifier>,
        clock: Arc<PausedClock>,
    ) -> Scheduler {
        let worker = Arc::new(SubmissionWorker::new(submitter, notifier).with_clock(clock.clone()));
        let store = ScheduleStore::in_dir(dir);
        let host = JobHost::new(worker, JobJournal::in_dir(dir))
            .with_schedule_store(store.clone())
            .with_clock(clock.clone());
        Scheduler::new(Arc::new(host), store).with_clock(clock)
    }

    fn at(clock: &PausedClock, secs: i64) -> DateTime<FixedOffset> {
        clock.now() + chrono::Duration::seconds(secs)
    }

    #[tokio::test(start_paused = true)]
    async fn past_target_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(PausedClock::starting_at(NOW));
        let submitter = Arc::new(ScriptedSubmitter::default());
        let scheduler = build(dir.path(), submitter.clone(), Default::default(), clock.clone());

        let err = scheduler.schedule_at(at(&clock, -60), "{}").await.unwrap_err();
        assert!(matches!(err, CourierError::InPast { .. }));
        let err = scheduler.schedule_at(at(&clock, 0), "{}").await.unwrap_err();
        assert!(err.to_string().contains("not in the future"));

        assert_eq!(scheduler.store().read().await, None);
        assert!(!scheduler.is_pending().await);
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(submitter.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_the_outstanding_submission() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(PausedClock::starting_at(NOW));
        let submitter = Arc::new(ScriptedSubmitter::default());
        let scheduler = build(dir.path(), submitter.clone(), Default::default(), clock.clone());

        scheduler.schedule_at(at(&clock, 120), "{\"n\":1}").await.unwrap();
        let second = scheduler.schedule_at(at(&clock, 60), "{\"n\":2}").await.unwrap();
        assert_eq!(scheduler.store().read().await, Some(second.target_iso()));
        assert_eq!(JobJournal::in_dir(dir.path()).load().await.len(), 1);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(submitter.payloads(), vec!["{\"n\":2}".to_string()]);
        assert_eq!(scheduler.store().read().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_job_but_keeps_the_saved_time() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(PausedClock::starting_at(NOW));
        let submitter = Arc::new(ScriptedSubmitter::default());
        let scheduler = build(dir.path(), submitter.clone(), Default::default(), clock.clone());

        let scheduled = scheduler.schedule_at(at(&clock, 30), "{}").await.unwrap();
        assert!(scheduler.is_pending().await);
        assert!(scheduler.cancel().await.unwrap());
        assert!(!scheduler.is_pending().await);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(submitter.call_count(), 0);
        assert_eq!(scheduler.store().read().await, Some(scheduled.target_iso()));
        assert_eq!(scheduler.snapshot().await.status, CountdownStatus::TimePassed);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_restores_the_outstanding_submission() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(PausedClock::starting_at(NOW));
        let first_run = Arc::new(ScriptedSubmitter::default());
        let scheduler = build(dir.path(), first_run.clone(), Default::default(), clock.clone());
        scheduler.schedule_at(at(&clock, 45), "{\"n\":9}").await.unwrap();
        scheduler.host().shutdown().await;

        let second_run = Arc::new(ScriptedSubmitter::default());
        let restarted = build(dir.path(), second_run.clone(), Default::default(), clock.clone());
        let mut done = restarted.host().subscribe();
        assert_eq!(restarted.restore().await, 1);
        assert!(restarted.is_pending().await);

        let completion = done.recv().await.unwrap();
        assert!(matches!(completion.outcome, WorkOutcome::Success { .. }));
        assert_eq!(first_run.call_count(), 0);
        assert_eq!(second_run.payloads(), vec!["{\"n\":9}".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_submission_retries_and_records_history() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryLog::in_dir(dir.path());
        let clock = Arc::new(PausedClock::starting_at(NOW));
        let submitter = Arc::new(
            ScriptedSubmitter::new([
                Ok("Error: timeout".to_string()),
                Ok("Status: 200\nOK".to_string()),
            ])
            .with_history(history.clone()),
        );
        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = build(dir.path(), submitter.clone(), notifier.clone(), clock.clone());
        let mut done = scheduler.host().subscribe();

        let started = tokio::time::Instant::now();
        scheduler
            .schedule_at(at(&clock, 5), r#"{"PatientName":"Rahima"}"#)
            .await
            .unwrap();
        assert_eq!(scheduler.snapshot().await.status, CountdownStatus::Pending);

        let completion = done.recv().await.unwrap();
        assert_eq!(
            completion.outcome,
            WorkOutcome::Success {
                attempts: 2,
                response: "Status: 200\nOK".into()
            }
        );

        let times = submitter.call_times();
        assert_eq!(times[0] - started, Duration::from_secs(5));
        assert_eq!(times[1] - times[0], Duration::from_secs(30));

        let records = history.read().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, "200");
        assert!(records[1].is_error());
        assert_eq!(records[1].response_body, "timeout");

        assert_eq!(scheduler.store().read().await, None);
        assert_eq!(scheduler.snapshot().await.status, CountdownStatus::NotScheduled);
        assert!(notifier
            .bodies()
            .iter()
            .any(|b| b == "Sent successfully: Status: 200\nOK"));
    }
}
