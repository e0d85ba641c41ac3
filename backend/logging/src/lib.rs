//! Structured logging for Courier.
//!
//! Console plus rolling NDJSON file output, PII redaction, and the
//! submission event trail.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogger, SubmissionEvent, SubmissionEventEntry};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
