//! Test doubles shared by the scheduler tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use courier_core::{Clock, HistoryEntry, Notifier, Submitter};

use crate::history::HistoryLog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u32,
    pub title: String,
    pub body: String,
    pub ongoing: bool,
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.notices().into_iter().map(|n| n.body).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, id: u32, title: &str, body: &str, ongoing: bool) -> Result<()> {
        self.notices.lock().unwrap().push(Notice {
            id,
            title: title.to_string(),
            body: body.to_string(),
            ongoing,
        });
        Ok(())
    }
}

/// Always fails to deliver.
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _: u32, _: &str, _: &str, _: bool) -> Result<()> {
        Err(anyhow!("notification surface unavailable"))
    }
}

/// Replays a fixed list of results and records when each call happened on
/// tokio's clock. Optionally appends to a history log like the real client.
#[derive(Default)]
pub struct ScriptedSubmitter {
    script: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<(tokio::time::Instant, String)>>,
    history: Option<HistoryLog>,
}

impl ScriptedSubmitter {
    pub fn new(results: impl IntoIterator<Item = Result<String>>) -> Self {
        Self {
            script: Mutex::new(results.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn with_history(mut self, history: HistoryLog) -> Self {
        self.history = Some(history);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<tokio::time::Instant> {
        self.calls.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub fn payloads(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
    }
}

#[async_trait]
impl Submitter for ScriptedSubmitter {
    async fn send(&self, payload: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((tokio::time::Instant::now(), payload.to_string()));
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("Status: 200\nOK".to_string()));

        if let (Some(history), Ok(result)) = (&self.history, &next) {
            let entry = match result.strip_prefix("Error: ") {
                Some(message) => HistoryEntry::error(message, payload),
                None => {
                    let (status, body) = result.split_once('\n').unwrap_or((result.as_str(), ""));
                    let code = status.trim_start_matches("Status: ").parse().unwrap_or(0);
                    HistoryEntry::response(code, body, payload)
                }
            };
            history.append(&entry).await.unwrap();
        }
        next
    }
}

/// Wall clock that moves with tokio's (pausable) clock.
pub struct PausedClock {
    base: DateTime<FixedOffset>,
    start: tokio::time::Instant,
}

impl PausedClock {
    pub fn starting_at(iso: &str) -> Self {
        Self {
            base: DateTime::parse_from_rfc3339(iso).unwrap(),
            start: tokio::time::Instant::now(),
        }
    }
}

impl Clock for PausedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.base + chrono::Duration::from_std(self.start.elapsed()).unwrap()
    }
}
