//! Submission worker: the retry state machine run when a deferred job fires.
//!
//! `START -> SENDING -> {SUCCESS, RETRY, TERMINAL_FAILURE}`. A retry waits the
//! policy's fixed backoff on tokio's timer, raced against the job's
//! cancellation token, then sends again.

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{
    AppointmentPayload, Clock, DoctorDefaults, JobInput, Notifier, Submitter, SystemClock,
    UNIQUE_JOB_KEY, WORKER_NOTICE_ID,
};
use courier_logging::{redact_sensitive_data, EventLogger, SubmissionEvent};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::retry::{classify, shorten, Classification, RetryPolicy, RetryState, NOTICE_EXCERPT_CHARS};

/// How a worker invocation ended. `attempts` counts sends made by this
/// invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkOutcome {
    Success { attempts: u32, response: String },
    Failure { attempts: u32, last_error: String },
    Cancelled { attempts: u32 },
}

impl WorkOutcome {
    /// Success and Failure end the job; Cancelled means it was superseded.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkOutcome::Cancelled { .. })
    }
}

/// Asked after every backoff whether the run still owns its job. A run that
/// lost ownership stops without sending again.
#[async_trait]
pub trait RunGuard: Send + Sync {
    async fn still_current(&self) -> bool;
}

/// Guard for runs nothing else can supersede.
pub struct Unguarded;

#[async_trait]
impl RunGuard for Unguarded {
    async fn still_current(&self) -> bool {
        true
    }
}

pub struct SubmissionWorker {
    submitter: Arc<dyn Submitter>,
    notifier: Arc<dyn Notifier>,
    policy: RetryPolicy,
    doctor: DoctorDefaults,
    clock: Arc<dyn Clock>,
}

impl SubmissionWorker {
    pub fn new(submitter: Arc<dyn Submitter>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            submitter,
            notifier,
            policy: RetryPolicy::default(),
            doctor: DoctorDefaults::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_doctor(mut self, doctor: DoctorDefaults) -> Self {
        self.doctor = doctor;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Drive the submitter until success, retry exhaustion, or cancellation.
    pub async fn run(&self, input: JobInput, cancel: CancellationToken) -> WorkOutcome {
        self.run_guarded(input, cancel, &Unguarded).await
    }

    /// Like [`run`](Self::run), but consults `guard` before every retry.
    pub async fn run_guarded(
        &self,
        input: JobInput,
        cancel: CancellationToken,
        guard: &dyn RunGuard,
    ) -> WorkOutcome {
        let payload = match input.payload_json {
            Some(p) if !p.trim().is_empty() => p,
            _ => {
                warn!(scheduled = %input.scheduled_iso, "Job input has no payload, using fallback");
                self.fallback_payload()
            }
        };

        let mut state = RetryState::starting_at(input.attempt);
        let mut sends = 0u32;

        self.notice(
            "Appointment worker",
            &format!("Starting attempt {}", state.attempt + 1),
        );

        loop {
            if cancel.is_cancelled() {
                return self.cancelled(sends);
            }

            self.notice(
                "Appointment worker",
                &format!("Attempt {}: sending...", state.attempt + 1),
            );
            EventLogger::log_event(
                UNIQUE_JOB_KEY,
                SubmissionEvent::Attempt {
                    attempt: state.attempt + 1,
                    payload: payload.clone(),
                },
            );

            let result = match self.submitter.send(&payload).await {
                Ok(result) => result,
                Err(e) => format!("Error: {e}"),
            };
            sends += 1;

            match classify(&result) {
                Classification::Success => {
                    info!(attempt = state.attempt + 1, "Appointment submitted");
                    EventLogger::log_event(
                        UNIQUE_JOB_KEY,
                        SubmissionEvent::Succeeded {
                            attempt: state.attempt + 1,
                            response: result.clone(),
                        },
                    );
                    self.notice(
                        "Appointment success",
                        &format!("Sent successfully: {}", shorten(&result, NOTICE_EXCERPT_CHARS)),
                    );
                    return WorkOutcome::Success {
                        attempts: sends,
                        response: result,
                    };
                }
                Classification::Error => {
                    let retry = state.record_failure(&self.policy, &result);
                    EventLogger::log_event(
                        UNIQUE_JOB_KEY,
                        SubmissionEvent::Failed {
                            attempt: state.attempt,
                            error: result.clone(),
                        },
                    );
                    self.notice(
                        "Appointment failed",
                        &format!(
                            "Attempt {} failed: {}",
                            state.attempt,
                            shorten(&result, NOTICE_EXCERPT_CHARS)
                        ),
                    );

                    if !retry {
                        EventLogger::log_event(
                            UNIQUE_JOB_KEY,
                            SubmissionEvent::Exhausted { attempts: state.attempt },
                        );
                        self.notice("Appointment failure", "All attempts failed");
                        return WorkOutcome::Failure {
                            attempts: sends,
                            last_error: result,
                        };
                    }

                    debug!(backoff_ms = self.policy.backoff_ms, "Backing off before retry");
                    tokio::select! {
                        _ = cancel.cancelled() => return self.cancelled(sends),
                        _ = tokio::time::sleep(self.policy.backoff()) => {}
                    }
                    if !guard.still_current().await {
                        info!(attempt = state.attempt + 1, "Job no longer current, not retrying");
                        return self.cancelled(sends);
                    }
                }
            }
        }
    }

    fn cancelled(&self, sends: u32) -> WorkOutcome {
        info!(attempts = sends, "Submission job cancelled");
        EventLogger::log_event(
            UNIQUE_JOB_KEY,
            SubmissionEvent::Cancelled {
                reason: "job cancelled or superseded".to_string(),
            },
        );
        WorkOutcome::Cancelled { attempts: sends }
    }

    fn fallback_payload(&self) -> String {
        let today = self.clock.now().date_naive();
        let payload = AppointmentPayload::fallback(today, &self.doctor);
        payload.to_json().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to serialize fallback payload");
            "{}".to_string()
        })
    }

    /// Best-effort: a notice that cannot be shown never aborts the job.
    fn notice(&self, title: &str, body: &str) {
        if let Err(e) = self.notifier.notify(WORKER_NOTICE_ID, title, body, false) {
            debug!(error = %e, body = %redact_sensitive_data(body), "Notice not delivered");
        }
    }
}
