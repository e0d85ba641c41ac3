use anyhow::Result;
use tracing::{debug, info};

use courier_core::Notifier;
use courier_logging::redact_sensitive_data;

/// Notifier that only writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, id: u32, title: &str, body: &str, ongoing: bool) -> Result<()> {
        if ongoing {
            debug!(notice_id = id, title, body, "Ongoing notice");
        } else {
            info!(notice_id = id, title, body = %redact_sensitive_data(body), "Notice");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{COUNTDOWN_NOTICE_ID, WORKER_NOTICE_ID};

    #[test]
    fn notices_are_always_delivered() {
        let notifier = TracingNotifier;
        assert!(notifier
            .notify(WORKER_NOTICE_ID, "Appointment failed", "Attempt 1 failed: Error: timeout", false)
            .is_ok());
        assert!(notifier
            .notify(COUNTDOWN_NOTICE_ID, "Scheduled Appointment", "00:00:05 remaining", true)
            .is_ok());
    }
}
