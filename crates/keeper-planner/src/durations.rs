use serde::{Deserialize, Serialize};

/// Timing constants of the round lifecycle, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundDurations {
    /// Minimum time a round stays Active before it may be ended
    pub active_secs: i64,
    /// Minimum time between the end of a payout and the next round
    pub cooldown_secs: i64,
}

impl RoundDurations {
    pub const DEFAULT_ACTIVE_SECS: i64 = 120;
    pub const DEFAULT_COOLDOWN_SECS: i64 = 360;

    pub fn new(active_secs: i64, cooldown_secs: i64) -> Self {
        Self {
            active_secs,
            cooldown_secs,
        }
    }
}

impl Default for RoundDurations {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ACTIVE_SECS, Self::DEFAULT_COOLDOWN_SECS)
    }
}
