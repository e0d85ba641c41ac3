pub mod clock;
pub mod error;
pub mod payload;
pub mod traits;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use error::CourierError;
pub use payload::{compute_full_age, AppointmentPayload, DoctorDefaults, PatientFields, PayloadSummary};
pub use traits::{Notifier, Submitter};
pub use types::{
    HistoryEntry, HistoryRecord, JobInput, Outcome, ScheduledSubmission, COUNTDOWN_NOTICE_ID,
    UNIQUE_JOB_KEY, WORKER_NOTICE_ID,
};
