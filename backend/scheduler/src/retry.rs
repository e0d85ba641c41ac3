//! Retry engine: fixed backoff between submission attempts.
//!
//! One initial attempt plus `max_retries` retries, each separated by the same
//! backoff interval.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Case-insensitive prefix that marks a normalized result as failed.
pub const ERROR_PREFIX: &str = "Error:";

/// Longest response excerpt shown in a notice.
pub const NOTICE_EXCERPT_CHARS: usize = 180;

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Wait between attempts in milliseconds.
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// `failed_attempts` is the attempt counter after it was incremented for
    /// the latest failure.
    pub fn should_retry(&self, failed_attempts: u32) -> bool {
        failed_attempts <= self.max_retries
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Retry bookkeeping for one worker invocation. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u32,
    pub last_error: Option<String>,
    pub exhausted: bool,
}

impl RetryState {
    pub fn starting_at(attempt: u32) -> Self {
        Self {
            attempt,
            ..Self::default()
        }
    }

    /// Record a failure. Returns `true` if another attempt is allowed.
    pub fn record_failure(&mut self, policy: &RetryPolicy, error: &str) -> bool {
        self.attempt = self.attempt.saturating_add(1);
        self.last_error = Some(error.to_string());

        if policy.should_retry(self.attempt) {
            warn!(
                attempt = self.attempt,
                max_retries = policy.max_retries,
                backoff_ms = policy.backoff_ms,
                "Submission failed, will retry"
            );
            true
        } else {
            self.exhausted = true;
            warn!(attempt = self.attempt, "Submission retry budget exhausted");
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    Error,
}

/// `Error` iff `result` starts with `"Error:"`, ignoring ASCII case.
pub fn classify(result: &str) -> Classification {
    let is_error = result
        .get(..ERROR_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(ERROR_PREFIX));
    if is_error {
        Classification::Error
    } else {
        Classification::Success
    }
}

/// Truncate to `max` characters, appending `...` when cut.
pub fn shorten(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}
