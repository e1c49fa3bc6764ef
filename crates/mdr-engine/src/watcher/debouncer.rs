//! Trigger debouncing for mutation-driven re-scans.
//!
//! Coalesces a burst of qualifying mutation batches into one trigger that
//! fires after a quiet period following the last batch.

use std::time::Duration;

use tokio::time::Instant;

/// Single-slot debouncer.
///
/// At most one trigger is pending. Recording a new event replaces the
/// pending deadline, which is equivalent to cancelling the scheduled
/// trigger and scheduling a fresh one.
#[derive(Debug)]
pub(crate) struct TriggerDebouncer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl TriggerDebouncer {
    /// Create a debouncer with the given quiet period.
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// Record a qualifying event observed at `now`.
    pub fn record(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    /// Deadline of the pending trigger, for timer scheduling.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the pending trigger if its deadline has passed.
    pub fn take_ready(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const QUIET: Duration = Duration::from_millis(500);

    #[test]
    fn test_nothing_pending_initially() {
        let mut debouncer = TriggerDebouncer::new(QUIET);
        assert_eq!(debouncer.deadline(), None);
        assert!(!debouncer.take_ready(Instant::now()));
    }

    #[test]
    fn test_fires_after_quiet_period() {
        let mut debouncer = TriggerDebouncer::new(QUIET);
        let start = Instant::now();
        debouncer.record(start);

        assert!(!debouncer.take_ready(start + Duration::from_millis(499)));
        assert!(debouncer.take_ready(start + QUIET));
        assert!(!debouncer.take_ready(start + QUIET), "trigger is consumed");
    }

    #[test]
    fn test_new_event_replaces_deadline() {
        let mut debouncer = TriggerDebouncer::new(QUIET);
        let start = Instant::now();
        debouncer.record(start);
        debouncer.record(start + Duration::from_millis(300));

        assert_eq!(
            debouncer.deadline(),
            Some(start + Duration::from_millis(800))
        );
        assert!(!debouncer.take_ready(start + QUIET));
        assert!(debouncer.take_ready(start + Duration::from_millis(800)));
    }
}
