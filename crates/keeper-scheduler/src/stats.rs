use serde::Serialize;

use crate::scheduler::CycleOutcome;

/// Running counters for the keeper loop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub cycles: u64,
    pub reads_failed: u64,
    pub anomalies: u64,
    pub waits: u64,
    pub confirmed: u64,
    pub rejected: u64,
    pub transient_errors: u64,
    /// Consecutive cycles that ended in a failure of any kind
    pub failure_streak: u32,
}

impl SchedulerStats {
    pub fn record(&mut self, outcome: &CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::ReadFailed(_) => self.reads_failed += 1,
            CycleOutcome::Anomaly(_) => self.anomalies += 1,
            CycleOutcome::Waited(_) => self.waits += 1,
            CycleOutcome::Executed { outcome, .. } => match outcome {
                keeper_remote::Outcome::Confirmed(_) => self.confirmed += 1,
                keeper_remote::Outcome::Rejected(_) => self.rejected += 1,
                keeper_remote::Outcome::TransientError(_) => self.transient_errors += 1,
            },
        }

        if outcome.is_failure() {
            self.failure_streak = self.failure_streak.saturating_add(1);
        } else {
            self.failure_streak = 0;
        }
    }

    /// True each time the streak reaches a multiple of `threshold`; a zero
    /// threshold never alerts
    pub fn should_alert(&self, threshold: u32) -> bool {
        threshold > 0 && self.failure_streak > 0 && self.failure_streak % threshold == 0
    }
}
