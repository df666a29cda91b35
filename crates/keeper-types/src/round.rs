use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;

/// Seconds since the unix epoch
pub type UnixTimestamp = i64;

/// Round lifecycle state as held by the remote program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    /// Waiting for the cooldown to elapse before the next round
    Inactive,
    /// Accepting deposits
    Active,
    /// Round closed, waiting on randomness and payout
    Cooldown,
}

impl RoundState {
    /// The only valid successor; the lifecycle is strictly cyclic
    pub fn next(self) -> RoundState {
        match self {
            RoundState::Inactive => RoundState::Active,
            RoundState::Active => RoundState::Cooldown,
            RoundState::Cooldown => RoundState::Inactive,
        }
    }

    /// Decode the on-chain enum tag (declaration order Active, Cooldown, Inactive)
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(RoundState::Active),
            1 => Some(RoundState::Cooldown),
            2 => Some(RoundState::Inactive),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            RoundState::Active => 0,
            RoundState::Cooldown => 1,
            RoundState::Inactive => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoundState::Inactive => "inactive",
            RoundState::Active => "active",
            RoundState::Cooldown => "cooldown",
        }
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time read of the round's shared account.
///
/// Fetched fresh every cycle and never cached; the planner only ever sees
/// the snapshot from the current cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub state: RoundState,
    /// Timestamp of the last state change, reference for elapsed time
    pub last_transition_time: UnixTimestamp,
    pub randomness_available: bool,
    /// Present once randomness resolved to a depositor
    pub winner: Option<Address>,
    /// Lamports recorded in the pot for the current round
    #[serde(default)]
    pub pot_lamports: u64,
    #[serde(default)]
    pub deposit_count: usize,
    /// Account that ended the round, entitled to the caller bonus
    #[serde(default)]
    pub end_round_caller: Option<Address>,
}

impl RoundSnapshot {
    pub fn new(state: RoundState, last_transition_time: UnixTimestamp) -> Self {
        Self {
            state,
            last_transition_time,
            randomness_available: false,
            winner: None,
            pot_lamports: 0,
            deposit_count: 0,
            end_round_caller: None,
        }
    }

    /// Mark randomness as fulfilled with the resolved winner, if any
    pub fn with_randomness(mut self, winner: Option<Address>) -> Self {
        self.randomness_available = true;
        self.winner = winner;
        self
    }

    pub fn with_pot(mut self, pot_lamports: u64, deposit_count: usize) -> Self {
        self.pot_lamports = pot_lamports;
        self.deposit_count = deposit_count;
        self
    }

    pub fn with_end_round_caller(mut self, caller: Address) -> Self {
        self.end_round_caller = Some(caller);
        self
    }

    /// Seconds spent in the current state; negative when the clock lags the chain
    pub fn elapsed(&self, now: UnixTimestamp) -> i64 {
        now.saturating_sub(self.last_transition_time)
    }
}
