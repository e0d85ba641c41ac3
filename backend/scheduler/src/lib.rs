pub mod client;
pub mod countdown;
pub mod history;
pub mod host;
pub mod job_journal;
pub mod notify;
pub mod retry;
pub mod schedule_store;
pub mod scheduler;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use client::NetworkClient;
pub use countdown::{CountdownNotifier, CountdownSnapshot, CountdownStatus};
pub use history::HistoryLog;
pub use host::{ConflictPolicy, JobCompletion, JobHost};
pub use job_journal::{JobJournal, JobRecord};
pub use notify::TracingNotifier;
pub use retry::{classify, Classification, RetryPolicy, RetryState};
pub use schedule_store::ScheduleStore;
pub use scheduler::Scheduler;
pub use worker::{RunGuard, SubmissionWorker, Unguarded, WorkOutcome};
