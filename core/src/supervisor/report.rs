//! Aggregation of per-handle stop results

use crate::error::StopError;

use super::stop::StopOutcome;

/// A successfully stopped handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopRecord {
    /// Slot index
    pub slot: usize,
    /// Process id
    pub pid: u32,
    /// How it stopped
    pub outcome: StopOutcome,
}

/// Result of stopping a set of handles
#[derive(Debug, Default)]
pub struct StopReport {
    /// Handles that are confirmed stopped, in slot order
    pub stopped: Vec<StopRecord>,

    /// Handles that could not be confirmed stopped
    pub failures: Vec<StopError>,
}

impl StopReport {
    /// Number of handles attempted
    pub fn total(&self) -> usize {
        self.stopped.len() + self.failures.len()
    }

    /// Whether every handle is confirmed stopped
    pub fn all_stopped(&self) -> bool {
        self.failures.is_empty()
    }

    /// Handles that had exited before the stop
    pub fn already_exited(&self) -> usize {
        self.count(|o| matches!(o, StopOutcome::AlreadyExited(_)))
    }

    /// Handles that honoured SIGTERM
    pub fn terminated(&self) -> usize {
        self.count(|o| matches!(o, StopOutcome::Terminated(_)))
    }

    /// Handles that needed SIGKILL
    pub fn killed(&self) -> usize {
        self.count(|o| matches!(o, StopOutcome::Killed(_)))
    }

    fn count(&self, pred: impl Fn(&StopOutcome) -> bool) -> usize {
        self.stopped.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Aggregate per-handle results, logging each failure
pub fn aggregate_stop_results(
    results: Vec<(usize, u32, Result<StopOutcome, StopError>)>,
) -> StopReport {
    let mut report = StopReport::default();

    for (slot, pid, result) in results {
        match result {
            Ok(outcome) => {
                tracing::debug!(slot, pid, outcome = outcome.as_str(), "Process stopped");
                report.stopped.push(StopRecord { slot, pid, outcome });
            }
            Err(err) => {
                tracing::error!(slot, pid, error = %err, "Failed to stop process");
                report.failures.push(err);
            }
        }
    }

    report.stopped.sort_by_key(|r| r.slot);

    if report.total() > 0 {
        tracing::info!(
            stopped = report.stopped.len(),
            already_exited = report.already_exited(),
            terminated = report.terminated(),
            killed = report.killed(),
            failed = report.failures.len(),
            "Stop completed"
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    fn exited(code: i32) -> ExitStatus {
        ExitStatus::from_raw(code << 8)
    }

    #[test]
    fn test_empty_report() {
        let report = aggregate_stop_results(vec![]);
        assert_eq!(report.total(), 0);
        assert!(report.all_stopped());
    }

    #[test]
    fn test_counts_by_outcome() {
        let report = aggregate_stop_results(vec![
            (2, 12, Ok(StopOutcome::Killed(ExitStatus::from_raw(9)))),
            (0, 10, Ok(StopOutcome::AlreadyExited(exited(0)))),
            (1, 11, Ok(StopOutcome::Terminated(ExitStatus::from_raw(15)))),
        ]);
        assert_eq!(report.total(), 3);
        assert_eq!(report.already_exited(), 1);
        assert_eq!(report.terminated(), 1);
        assert_eq!(report.killed(), 1);
        assert_eq!(
            report.stopped.iter().map(|r| r.slot).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_failure_does_not_hide_other_results() {
        let report = aggregate_stop_results(vec![
            (0, 10, Err(StopError::Unreaped { slot: 0, pid: 10 })),
            (1, 11, Ok(StopOutcome::Terminated(ExitStatus::from_raw(15)))),
        ]);
        assert!(!report.all_stopped());
        assert_eq!(report.total(), 2);
        assert_eq!(report.terminated(), 1);
    }
}
