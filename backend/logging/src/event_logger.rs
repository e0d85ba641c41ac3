//! Submission Event Logger
//!
//! Lifecycle events of a deferred submission (scheduled, attempt, result)
//! emitted on the `submission_events` tracing target, so the JSON file layer
//! carries a machine-readable trail next to the history log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubmissionEvent {
    Scheduled { target: String },
    Cancelled { reason: String },
    Attempt { attempt: u32, payload: String },
    Succeeded { attempt: u32, response: String },
    Failed { attempt: u32, error: String },
    Exhausted { attempts: u32 },
}

#[derive(Debug, Serialize)]
pub struct SubmissionEventEntry {
    pub job_key: String,
    pub timestamp: DateTime<Utc>,
    pub event: SubmissionEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Redacts free-text fields, then emits the event as one JSON object.
    pub fn log_event(job_key: &str, event: SubmissionEvent) {
        let entry = Self::entry(job_key, event);
        match serde_json::to_string(&entry) {
            Ok(json) => info!(target: "submission_events", event = %json, "Submission event"),
            Err(e) => warn!(target: "submission_events", error = %e, "Unserializable submission event"),
        }
    }

    fn entry(job_key: &str, mut event: SubmissionEvent) -> SubmissionEventEntry {
        match &mut event {
            SubmissionEvent::Attempt { payload, .. } => {
                *payload = redact_sensitive_data(payload);
            }
            SubmissionEvent::Succeeded { response, .. } => {
                *response = redact_sensitive_data(response);
            }
            SubmissionEvent::Failed { error, .. } => {
                *error = redact_sensitive_data(error);
            }
            SubmissionEvent::Scheduled { .. }
            | SubmissionEvent::Cancelled { .. }
            | SubmissionEvent::Exhausted { .. } => {}
        }

        SubmissionEventEntry {
            job_key: job_key.into(),
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_entries_serialize_tagged_and_redacted() {
        let entry = EventLogger::entry(
            "one_time_appointment_unique",
            SubmissionEvent::Attempt {
                attempt: 2,
                payload: r#"{"MobileNo":"01712345678"}"#.into(),
            },
        );
        let json: serde_json::Value = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["job_key"], "one_time_appointment_unique");
        assert_eq!(json["event"]["type"], "attempt");
        assert_eq!(json["event"]["attempt"], 2);
        let payload = json["event"]["payload"].as_str().unwrap();
        assert!(!payload.contains("01712345678"));
        assert!(payload.contains("[REDACTED_PHONE]"));
    }

    #[test]
    fn exhausted_entries_carry_the_attempt_count() {
        let entry = EventLogger::entry("k", SubmissionEvent::Exhausted { attempts: 3 });
        let json: serde_json::Value = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"], serde_json::json!({"type": "exhausted", "attempts": 3}));
    }
}
