/// Countdown to the scheduled fire time.
///
/// Ticks once per second while a foreground view is open, overwriting a
/// single ongoing notice with the time remaining. Independent of the
/// submission worker: stopping the countdown never touches the job.
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use courier_core::{Clock, CourierError, Notifier, SystemClock, COUNTDOWN_NOTICE_ID};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const COUNTDOWN_TITLE: &str = "Scheduled Appointment";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStatus {
    NotScheduled,
    Pending,
    TimePassed,
    Reached,
    Invalid,
}

impl fmt::Display for CountdownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CountdownStatus::NotScheduled => "Not scheduled",
            CountdownStatus::Pending => "Pending",
            CountdownStatus::TimePassed => "Time passed",
            CountdownStatus::Reached => "Running / Reached",
            CountdownStatus::Invalid => "Invalid saved schedule",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownSnapshot {
    pub status: CountdownStatus,
    /// Whole seconds left; zero unless `Pending`.
    pub remaining_secs: i64,
}

impl CountdownSnapshot {
    fn of(status: CountdownStatus) -> Self {
        Self {
            status,
            remaining_secs: 0,
        }
    }

    /// `HH:MM:SS remaining` while pending, otherwise the status label.
    pub fn label(&self) -> String {
        match self.status {
            CountdownStatus::Pending => format!("{} remaining", format_remaining(self.remaining_secs)),
            status => status.to_string(),
        }
    }
}

/// `HH:MM:SS`; hours are not wrapped at 24.
pub fn format_remaining(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Status of a saved schedule slot as seen at `now`.
pub fn describe(saved: Option<&str>, now: DateTime<FixedOffset>) -> CountdownSnapshot {
    let Some(iso) = saved else {
        return CountdownSnapshot::of(CountdownStatus::NotScheduled);
    };
    match DateTime::parse_from_rfc3339(iso.trim()) {
        Ok(target) => {
            let remaining = target - now;
            if remaining > chrono::Duration::zero() {
                CountdownSnapshot {
                    status: CountdownStatus::Pending,
                    remaining_secs: remaining.num_seconds(),
                }
            } else {
                CountdownSnapshot::of(CountdownStatus::TimePassed)
            }
        }
        Err(e) => {
            debug!(saved = iso, error = %e, "Saved schedule is not a valid timestamp");
            CountdownSnapshot::of(CountdownStatus::Invalid)
        }
    }
}

pub struct CountdownNotifier {
    target: DateTime<FixedOffset>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    tick: Duration,
}

impl CountdownNotifier {
    pub fn new(target: DateTime<FixedOffset>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            target,
            notifier,
            clock: Arc::new(SystemClock),
            tick: Duration::from_secs(1),
        }
    }

    pub fn from_iso(iso: &str, notifier: Arc<dyn Notifier>) -> Result<Self, CourierError> {
        let target = DateTime::parse_from_rfc3339(iso.trim())
            .map_err(|e| CourierError::Parse(format!("invalid schedule time {iso:?}: {e}")))?;
        Ok(Self::new(target, notifier))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn target(&self) -> DateTime<FixedOffset> {
        self.target
    }

    /// Tick until the target is reached or `cancel` fires.
    ///
    /// Returns `Reached` when the target time arrives and `Pending` when
    /// stopped early. `on_tick` sees every snapshot, including the final one.
    pub async fn run(
        &self,
        cancel: CancellationToken,
        mut on_tick: impl FnMut(&CountdownSnapshot),
    ) -> CountdownStatus {
        let mut interval = time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Countdown stopped");
                    return CountdownStatus::Pending;
                }
                _ = interval.tick() => {}
            }

            let remaining = self.target - self.clock.now();
            if remaining <= chrono::Duration::zero() {
                info!(target = %self.target, "Scheduled time reached");
                on_tick(&CountdownSnapshot::of(CountdownStatus::Reached));
                return CountdownStatus::Reached;
            }

            let snapshot = CountdownSnapshot {
                status: CountdownStatus::Pending,
                remaining_secs: remaining.num_seconds(),
            };
            let body = snapshot.label();
            if let Err(e) = self.notifier.notify(COUNTDOWN_NOTICE_ID, COUNTDOWN_TITLE, &body, true) {
                debug!(error = %e, "Countdown notice not delivered");
            }
            on_tick(&snapshot);
        }
    }
}
