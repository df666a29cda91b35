use keeper_planner::{Decision, TransitionPlanner, WaitReason};
use keeper_remote::{Anomaly, Outcome, ReadError, StateReader, TransitionExecutor};
use keeper_types::{Clock, RoundSnapshot, TransitionCommand};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

/// Where the loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    Reading,
    Planning,
    Executing,
    Sleeping,
}

impl fmt::Display for SchedulerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerPhase::Idle => "idle",
            SchedulerPhase::Reading => "reading",
            SchedulerPhase::Planning => "planning",
            SchedulerPhase::Executing => "executing",
            SchedulerPhase::Sleeping => "sleeping",
        };
        f.write_str(name)
    }
}

/// How a single cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    ReadFailed(String),
    Anomaly(Anomaly),
    Waited(WaitReason),
    Executed {
        command: TransitionCommand,
        outcome: Outcome,
    },
}

impl CycleOutcome {
    pub fn is_failure(&self) -> bool {
        match self {
            CycleOutcome::ReadFailed(_) | CycleOutcome::Anomaly(_) => true,
            CycleOutcome::Waited(_) => false,
            CycleOutcome::Executed { outcome, .. } => !outcome.is_confirmed(),
        }
    }

    pub fn command(&self) -> Option<TransitionCommand> {
        match self {
            CycleOutcome::Executed { command, .. } => Some(*command),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub poll_interval: Duration,
    /// Upper bound on each read and each submission
    pub call_timeout: Duration,
    pub failure_alert_threshold: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            call_timeout: Duration::from_secs(10),
            failure_alert_threshold: 5,
        }
    }
}

/// Single-threaded poll loop. Holds no state that affects decisions: every
/// cycle starts from a fresh read, so the process can restart at any time.
pub struct Scheduler {
    reader: Arc<dyn StateReader>,
    planner: TransitionPlanner,
    executor: TransitionExecutor,
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
    phase: SchedulerPhase,
    stats: crate::SchedulerStats,
    last_snapshot: Option<RoundSnapshot>,
}

impl Scheduler {
    pub fn new(
        reader: Arc<dyn StateReader>,
        planner: TransitionPlanner,
        executor: TransitionExecutor,
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            reader,
            planner,
            executor,
            clock,
            settings,
            phase: SchedulerPhase::Idle,
            stats: crate::SchedulerStats::default(),
            last_snapshot: None,
        }
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    pub fn stats(&self) -> &crate::SchedulerStats {
        &self.stats
    }

    /// Most recent successful read; diagnostics only
    pub fn last_snapshot(&self) -> Option<&RoundSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Run cycles until `cancel` fires. Cancellation is honored between
    /// cycles and while sleeping, never in the middle of a submission.
    pub async fn run(&mut self, cancel: CancellationToken) -> crate::SchedulerStats {
        info!(
            poll_interval_secs = self.settings.poll_interval.as_secs(),
            active_secs = self.planner.durations().active_secs,
            cooldown_secs = self.planner.durations().cooldown_secs,
            "keeper loop started"
        );

        while !cancel.is_cancelled() {
            self.run_cycle().await;

            self.enter(SchedulerPhase::Sleeping);
            tokio::select! {
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
                _ = cancel.cancelled() => break,
            }
        }

        self.enter(SchedulerPhase::Idle);
        let stats = &self.stats;
        info!(
            cycles = stats.cycles,
            confirmed = stats.confirmed,
            rejected = stats.rejected,
            transient_errors = stats.transient_errors,
            reads_failed = stats.reads_failed,
            anomalies = stats.anomalies,
            "keeper loop stopped"
        );
        self.stats.clone()
    }

    /// One read-plan-execute pass. Never fails; every error is classified
    /// into the returned outcome and logged.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let cycle = self.stats.cycles + 1;
        let span = tracing::info_span!("cycle", cycle);
        let outcome = self.cycle_inner().instrument(span.clone()).await;

        self.stats.record(&outcome);
        let _entered = span.enter();
        if self.stats.should_alert(self.settings.failure_alert_threshold) {
            warn!(
                failure_streak = self.stats.failure_streak,
                "consecutive keeper cycles failing"
            );
        }
        self.enter(SchedulerPhase::Idle);
        outcome
    }

    async fn cycle_inner(&mut self) -> CycleOutcome {
        self.enter(SchedulerPhase::Reading);
        let read = match tokio::time::timeout(self.settings.call_timeout, self.reader.fetch()).await {
            Ok(read) => read,
            Err(_) => Err(ReadError::Unavailable(format!(
                "read timed out after {}s",
                self.settings.call_timeout.as_secs()
            ))),
        };

        let snapshot = match read {
            Ok(snapshot) => snapshot,
            Err(ReadError::Unavailable(reason)) => {
                warn!(error = %reason, "round state unavailable, skipping cycle");
                return CycleOutcome::ReadFailed(reason);
            }
            Err(ReadError::Anomaly(anomaly)) => {
                error!(anomaly = %anomaly, "round state anomaly, taking no action");
                return CycleOutcome::Anomaly(anomaly);
            }
        };

        let now = self.clock.now();
        info!(
            state = %snapshot.state,
            elapsed_secs = snapshot.elapsed(now),
            randomness = snapshot.randomness_available,
            pot_lamports = snapshot.pot_lamports,
            deposits = snapshot.deposit_count,
            "round observed"
        );
        self.last_snapshot = Some(snapshot.clone());

        self.enter(SchedulerPhase::Planning);
        let command = match self.planner.decide(&snapshot, now) {
            Decision::Wait { why } => {
                info!(reason = %why, "no transition due");
                return CycleOutcome::Waited(why);
            }
            Decision::Issue { command } => command,
        };
        info!(command = %command, "transition due");

        self.enter(SchedulerPhase::Executing);
        let outcome = match tokio::time::timeout(
            self.settings.call_timeout,
            self.executor.execute(command, &snapshot),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Outcome::TransientError(format!(
                "submission timed out after {}s",
                self.settings.call_timeout.as_secs()
            )),
        };

        match &outcome {
            Outcome::Confirmed(receipt) => {
                info!(command = %command, outcome = outcome.label(), signature = %receipt.signature, "transition confirmed");
            }
            Outcome::Rejected(reason) if reason.is_expected_race() => {
                info!(command = %command, outcome = outcome.label(), reason = %reason, "transition already applied or not yet valid");
            }
            Outcome::Rejected(reason) => {
                warn!(command = %command, outcome = outcome.label(), reason = %reason, "transition rejected");
            }
            Outcome::TransientError(msg) => {
                warn!(command = %command, outcome = outcome.label(), error = %msg, "transition not confirmed, will re-plan next cycle");
            }
        }

        CycleOutcome::Executed { command, outcome }
    }

    fn enter(&mut self, phase: SchedulerPhase) {
        debug!(from = %self.phase, to = %phase, "phase");
        self.phase = phase;
    }
}
