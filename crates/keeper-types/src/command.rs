use serde::{Deserialize, Serialize};
use std::fmt;

use crate::round::RoundState;

/// Idempotent request to advance the round.
///
/// Issuing a command after the remote state moved past its precondition is
/// expected (another keeper won the race) and yields a rejection, never a
/// duplicate effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCommand {
    StartRound,
    EndRound,
    DistributeRewards,
    ResetIfNoWinner,
}

impl TransitionCommand {
    pub const ALL: [TransitionCommand; 4] = [
        TransitionCommand::StartRound,
        TransitionCommand::EndRound,
        TransitionCommand::DistributeRewards,
        TransitionCommand::ResetIfNoWinner,
    ];

    /// Name of the remote program instruction
    pub fn instruction_name(&self) -> &'static str {
        match self {
            TransitionCommand::StartRound => "start_round",
            TransitionCommand::EndRound => "end_round",
            TransitionCommand::DistributeRewards => "distribute_rewards",
            TransitionCommand::ResetIfNoWinner => "reset_if_no_winner",
        }
    }

    /// State the remote program requires before accepting the command
    pub fn precondition(&self) -> RoundState {
        match self {
            TransitionCommand::StartRound => RoundState::Inactive,
            TransitionCommand::EndRound => RoundState::Active,
            TransitionCommand::DistributeRewards | TransitionCommand::ResetIfNoWinner => {
                RoundState::Cooldown
            }
        }
    }

    /// State the round is in once the command is confirmed
    pub fn postcondition(&self) -> RoundState {
        self.precondition().next()
    }
}

impl fmt::Display for TransitionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.instruction_name())
    }
}
