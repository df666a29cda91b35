use serde::{Deserialize, Serialize};

/// Per-mille shares of the pot paid out when a round has a winner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutSplit {
    pub winner_per_mille: u64,
    pub buyback_per_mille: u64,
    pub fee_per_mille: u64,
    pub caller_per_mille: u64,
}

impl PayoutSplit {
    pub const STANDARD: PayoutSplit = PayoutSplit {
        winner_per_mille: 969,
        buyback_per_mille: 25,
        fee_per_mille: 5,
        caller_per_mille: 1,
    };

    pub fn total_per_mille(&self) -> u64 {
        self.winner_per_mille
            .saturating_add(self.buyback_per_mille)
            .saturating_add(self.fee_per_mille)
            .saturating_add(self.caller_per_mille)
    }

    /// Compute the lamport amounts for a pot of `total` lamports.
    ///
    /// Shares are paid in field order and each is capped by what is left,
    /// so a split over 1000 per mille can never pay out more than the pot.
    pub fn plan(&self, total: u64) -> PayoutPlan {
        let mut left = total;
        let mut take = |per_mille: u64| -> u64 {
            // u128 keeps `total * per_mille` from overflowing for large pots
            let share = (total as u128 * per_mille as u128) / 1000;
            let paid = share.min(left as u128) as u64;
            left -= paid;
            paid
        };

        let winner = take(self.winner_per_mille);
        let buyback = take(self.buyback_per_mille);
        let fee = take(self.fee_per_mille);
        let caller_bonus = take(self.caller_per_mille);
        let retained = left;

        PayoutPlan {
            total,
            winner,
            buyback,
            fee,
            caller_bonus,
            retained,
        }
    }
}

impl Default for PayoutSplit {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Expected transfers for a DistributeRewards command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutPlan {
    pub total: u64,
    pub winner: u64,
    pub buyback: u64,
    pub fee: u64,
    pub caller_bonus: u64,
    /// Rounding dust left in the pot account
    pub retained: u64,
}

impl PayoutPlan {
    pub fn for_pot(total: u64) -> Self {
        PayoutSplit::STANDARD.plan(total)
    }

    pub fn distributed(&self) -> u64 {
        self.winner + self.buyback + self.fee + self.caller_bonus
    }
}
