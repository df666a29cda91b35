use keeper_types::{RoundSnapshot, RoundState, TransitionCommand, UnixTimestamp};
use serde::Serialize;
use std::fmt;

use crate::durations::RoundDurations;

/// Why the planner chose not to act this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum WaitReason {
    /// Inactive, cooldown not yet elapsed
    CooldownPending { remaining_secs: i64 },
    /// Active, round duration not yet elapsed
    RoundInProgress { remaining_secs: i64 },
    /// Cooldown, randomness not yet fulfilled
    AwaitingRandomness,
}

impl fmt::Display for WaitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitReason::CooldownPending { remaining_secs } => {
                write!(f, "cooldown pending ({remaining_secs}s left)")
            }
            WaitReason::RoundInProgress { remaining_secs } => {
                write!(f, "round in progress ({remaining_secs}s left)")
            }
            WaitReason::AwaitingRandomness => f.write_str("awaiting randomness"),
        }
    }
}

/// Outcome of one planning step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Issue { command: TransitionCommand },
    Wait { why: WaitReason },
}

impl Decision {
    pub fn command(&self) -> Option<TransitionCommand> {
        match self {
            Decision::Issue { command } => Some(*command),
            Decision::Wait { .. } => None,
        }
    }
}

/// Pure decision table mapping a snapshot and the current time to the next
/// transition. Holds no state between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionPlanner {
    durations: RoundDurations,
}

impl TransitionPlanner {
    pub fn new(durations: RoundDurations) -> Self {
        Self { durations }
    }

    pub fn durations(&self) -> RoundDurations {
        self.durations
    }

    /// The single transition, if any, that should be attempted next
    pub fn plan(&self, snapshot: &RoundSnapshot, now: UnixTimestamp) -> Option<TransitionCommand> {
        self.decide(snapshot, now).command()
    }

    /// Like [`plan`](Self::plan) but keeps the reason for waiting
    pub fn decide(&self, snapshot: &RoundSnapshot, now: UnixTimestamp) -> Decision {
        let elapsed = snapshot.elapsed(now);

        match snapshot.state {
            RoundState::Inactive => {
                // Boundary-inclusive: the command fires on the exact tick
                if elapsed >= self.durations.cooldown_secs {
                    Decision::Issue {
                        command: TransitionCommand::StartRound,
                    }
                } else {
                    Decision::Wait {
                        why: WaitReason::CooldownPending {
                            remaining_secs: remaining(self.durations.cooldown_secs, elapsed),
                        },
                    }
                }
            }
            RoundState::Active => {
                if elapsed >= self.durations.active_secs {
                    Decision::Issue {
                        command: TransitionCommand::EndRound,
                    }
                } else {
                    Decision::Wait {
                        why: WaitReason::RoundInProgress {
                            remaining_secs: remaining(self.durations.active_secs, elapsed),
                        },
                    }
                }
            }
            RoundState::Cooldown => {
                if !snapshot.randomness_available {
                    return Decision::Wait {
                        why: WaitReason::AwaitingRandomness,
                    };
                }
                let command = match snapshot.winner {
                    Some(_) => TransitionCommand::DistributeRewards,
                    None => TransitionCommand::ResetIfNoWinner,
                };
                Decision::Issue { command }
            }
        }
    }
}

fn remaining(duration: i64, elapsed: i64) -> i64 {
    duration.saturating_sub(elapsed)
}
