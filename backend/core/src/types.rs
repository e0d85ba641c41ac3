use std::fmt;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::error::CourierError;
use crate::payload::PayloadSummary;

/// Key under which the single outstanding deferred submission is enqueued.
pub const UNIQUE_JOB_KEY: &str = "one_time_appointment_unique";

/// Notice id shared by every attempt/result notice of the worker.
pub const WORKER_NOTICE_ID: u32 = 2001;

/// Notice id of the ongoing countdown notice.
pub const COUNTDOWN_NOTICE_ID: u32 = 9999;

/// Status text written to the history log for failed calls.
pub const ERROR_STATUS: &str = "ERROR";

/// Input handed to the deferred job when it fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    /// Missing when the input did not survive a restart; the worker then
    /// falls back to a placeholder payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_json: Option<String>,
    pub scheduled_iso: String,
    #[serde(default)]
    pub attempt: u32,
}

/// A future submission accepted by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledSubmission {
    pub target: DateTime<FixedOffset>,
    pub payload: String,
    pub attempt: u32,
}

impl ScheduledSubmission {
    /// Build a submission, rejecting targets that are not strictly after `now`.
    pub fn new(
        target: DateTime<FixedOffset>,
        payload: impl Into<String>,
        now: DateTime<FixedOffset>,
    ) -> Result<Self, CourierError> {
        if target <= now {
            return Err(CourierError::InPast {
                target: target.to_rfc3339_opts(SecondsFormat::Secs, false),
            });
        }
        Ok(Self {
            target,
            payload: payload.into(),
            attempt: 0,
        })
    }

    /// The persisted form of the target time.
    pub fn target_iso(&self) -> String {
        self.target.to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    pub fn to_job_input(&self) -> JobInput {
        JobInput {
            payload_json: Some(self.payload.clone()),
            scheduled_iso: self.target_iso(),
            attempt: self.attempt,
        }
    }
}

/// Result of one outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    StatusCode(u16),
    Error(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::StatusCode(code) => write!(f, "{code}"),
            Outcome::Error(_) => f.write_str(ERROR_STATUS),
        }
    }
}

/// One attempt, as appended to the history log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub timestamp: NaiveDateTime,
    pub outcome: Outcome,
    pub response_body: String,
    pub raw_payload: String,
}

impl HistoryEntry {
    pub fn response(code: u16, body: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now().naive_local(),
            outcome: Outcome::StatusCode(code),
            response_body: body.into(),
            raw_payload: payload.into(),
        }
    }

    pub fn error(message: impl Into<String>, payload: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            timestamp: Local::now().naive_local(),
            outcome: Outcome::Error(message.clone()),
            response_body: message,
            raw_payload: payload.into(),
        }
    }

    /// ISO local date-time, millisecond precision.
    pub fn timestamp_text(&self) -> String {
        self.timestamp.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
    }

    /// Response body for a status code, message for an error.
    pub fn text(&self) -> &str {
        match &self.outcome {
            Outcome::StatusCode(_) => &self.response_body,
            Outcome::Error(message) => message,
        }
    }
}

/// One history line as read back, most recent first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    /// Position in the most-recent-first listing.
    pub id: usize,
    pub timestamp: String,
    /// Status code text or `"ERROR"`, verbatim.
    pub status: String,
    pub response_body: String,
    pub raw_payload: String,
    /// Fields derived from the payload; `None` when it is not a JSON object.
    pub details: Option<PayloadSummary>,
}

impl HistoryRecord {
    pub fn is_error(&self) -> bool {
        self.status == ERROR_STATUS
    }

    /// Typed view of `status`, if it is recognizable.
    pub fn outcome(&self) -> Option<Outcome> {
        if self.is_error() {
            return Some(Outcome::Error(self.response_body.clone()));
        }
        self.status.trim().parse().ok().map(Outcome::StatusCode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(iso: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(iso).unwrap()
    }

    #[test]
    fn submission_rejects_past_and_present_targets() {
        let now = at("2026-10-19T08:00:00+06:00");
        assert!(matches!(
            ScheduledSubmission::new(now, "{}", now),
            Err(CourierError::InPast { .. })
        ));
        assert!(ScheduledSubmission::new(now - Duration::seconds(1), "{}", now).is_err());

        let sub = ScheduledSubmission::new(now + Duration::minutes(5), "{}", now).unwrap();
        assert_eq!(sub.attempt, 0);
        assert_eq!(sub.target_iso(), "2026-10-19T08:05:00+06:00");
    }

    #[test]
    fn job_input_uses_camel_case_keys() {
        let input = JobInput {
            payload_json: Some("{}".into()),
            scheduled_iso: "2026-10-19T08:05:00+06:00".into(),
            attempt: 0,
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["payloadJson"], "{}");
        assert_eq!(json["scheduledIso"], "2026-10-19T08:05:00+06:00");

        let lost: JobInput =
            serde_json::from_str(r#"{"scheduledIso":"2026-10-19T08:05:00+06:00"}"#).unwrap();
        assert_eq!(lost.payload_json, None);
        assert_eq!(lost.attempt, 0);
    }

    #[test]
    fn error_entries_carry_message_as_text() {
        let entry = HistoryEntry::error("timeout", "{}");
        assert_eq!(entry.outcome.to_string(), "ERROR");
        assert_eq!(entry.text(), "timeout");

        let ok = HistoryEntry::response(201, "created", "{}");
        assert_eq!(ok.outcome.to_string(), "201");
        assert_eq!(ok.text(), "created");
    }
}
