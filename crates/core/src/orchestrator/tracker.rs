//! Per-stage attempt tracking.

use super::types::{OrchestratorError, Stage};

/// Tracks failed attempts for one stage of a run.
///
/// The counter is `None` once the stage is no longer active, either because
/// the run advanced past it or because it failed for good.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTransactionTracker {
    stage: Stage,
    attempts: Option<u32>,
}

impl StageTransactionTracker {
    /// A tracker for a stage that is currently running.
    pub fn active(stage: Stage) -> Self {
        Self {
            stage,
            attempts: Some(0),
        }
    }

    /// A tracker for a stage that has not started.
    pub fn inactive(stage: Stage) -> Self {
        Self {
            stage,
            attempts: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_active(&self) -> bool {
        self.attempts.is_some()
    }

    /// Failed attempts so far, `None` when inactive.
    pub fn attempts(&self) -> Option<u32> {
        self.attempts
    }

    /// Count one more failed attempt and return the new total.
    pub fn record_failure(&mut self) -> Result<u32, OrchestratorError> {
        match self.attempts.as_mut() {
            Some(attempts) => {
                *attempts += 1;
                Ok(*attempts)
            }
            None => Err(OrchestratorError::InconsistentState(format!(
                "failure recorded for inactive {}",
                self.stage
            ))),
        }
    }

    /// Start tracking with a fresh counter.
    pub fn activate(&mut self) {
        self.attempts = Some(0);
    }

    /// Stop tracking. Idempotent.
    pub fn deactivate(&mut self) {
        self.attempts = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_tracker_counts_failures() {
        let mut tracker = StageTransactionTracker::active(Stage::One);
        assert!(tracker.is_active());
        assert_eq!(tracker.attempts(), Some(0));

        assert_eq!(tracker.record_failure().unwrap(), 1);
        assert_eq!(tracker.record_failure().unwrap(), 2);
        assert_eq!(tracker.attempts(), Some(2));
    }

    #[test]
    fn test_deactivate_is_idempotent() {
        let mut tracker = StageTransactionTracker::active(Stage::Two);
        tracker.deactivate();
        tracker.deactivate();
        assert!(!tracker.is_active());
        assert_eq!(tracker.attempts(), None);
    }

    #[test]
    fn test_record_failure_after_deactivate_is_inconsistent() {
        let mut tracker = StageTransactionTracker::active(Stage::One);
        tracker.deactivate();

        let err = tracker.record_failure().unwrap_err();
        assert!(matches!(err, OrchestratorError::InconsistentState(_)));
        assert_eq!(
            err.to_string(),
            "unexpected orchestrator state: failure recorded for inactive stage one"
        );
        assert!(!tracker.is_active());
    }

    #[test]
    fn test_activate_resets_counter() {
        let mut tracker = StageTransactionTracker::inactive(Stage::Two);
        assert!(!tracker.is_active());

        tracker.activate();
        assert_eq!(tracker.attempts(), Some(0));
        assert_eq!(tracker.stage(), Stage::Two);
    }
}
