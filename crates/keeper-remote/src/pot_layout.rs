use borsh::{BorshDeserialize, BorshSerialize};
use keeper_types::{Address, RoundSnapshot, RoundState};

use crate::error::Anomaly;
use crate::program::{account_discriminator, POT_ACCOUNT_NAME};

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DepositRecord {
    pub depositor: [u8; 32],
    pub amount: u64,
    pub timestamp: i64,
}

/// Raw pot account fields in on-chain order.
///
/// `game_state` stays a raw tag so unknown values surface as an
/// [`Anomaly`] instead of failing inside the Borsh decoder.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PotAccount {
    pub admin: [u8; 32],
    pub bump: u8,
    pub total_amount: u64,
    pub deposits: Vec<DepositRecord>,
    pub game_state: u8,
    pub last_reset: i64,
    pub randomness: Option<[u8; 32]>,
    pub end_game_caller: Option<[u8; 32]>,
}

impl PotAccount {
    /// Decode account data; trailing allocation padding is ignored
    pub fn decode(data: &[u8]) -> Result<Self, Anomaly> {
        if data.len() < 8 {
            return Err(Anomaly::Malformed(format!(
                "{} bytes is shorter than the discriminator",
                data.len()
            )));
        }

        let (discriminator, mut body) = data.split_at(8);
        let expected = account_discriminator(POT_ACCOUNT_NAME);
        if discriminator != expected.as_slice() {
            return Err(Anomaly::Discriminator(format!(
                "got {}, expected {}",
                hex::encode(discriminator),
                hex::encode(expected)
            )));
        }

        PotAccount::deserialize(&mut body).map_err(|e| Anomaly::Malformed(e.to_string()))
    }

    /// Discriminator followed by the Borsh body
    pub fn encode(&self) -> Vec<u8> {
        let mut data = account_discriminator(POT_ACCOUNT_NAME).to_vec();
        // Writing into a Vec cannot fail
        if let Ok(body) = borsh::to_vec(self) {
            data.extend_from_slice(&body);
        }
        data
    }

    /// Depositor selected by the fulfilled randomness, mirroring the
    /// program's `randomness[0] % deposits.len()` rule
    pub fn winner(&self) -> Option<Address> {
        let randomness = self.randomness?;
        if self.deposits.is_empty() {
            return None;
        }
        let index = randomness[0] as usize % self.deposits.len();
        Some(Address::new(self.deposits[index].depositor))
    }

    pub fn to_snapshot(&self) -> Result<RoundSnapshot, Anomaly> {
        let state =
            RoundState::from_tag(self.game_state).ok_or(Anomaly::UnknownState(self.game_state))?;

        let mut snapshot = RoundSnapshot::new(state, self.last_reset)
            .with_pot(self.total_amount, self.deposits.len());
        if self.randomness.is_some() {
            snapshot = snapshot.with_randomness(self.winner());
        }
        if let Some(caller) = self.end_game_caller {
            snapshot = snapshot.with_end_round_caller(Address::new(caller));
        }
        Ok(snapshot)
    }
}

/// Decode raw account bytes straight into a snapshot
pub fn decode_snapshot(data: &[u8]) -> Result<RoundSnapshot, Anomaly> {
    PotAccount::decode(data)?.to_snapshot()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pot(state: RoundState) -> PotAccount {
        PotAccount {
            admin: [1u8; 32],
            bump: 254,
            total_amount: 0,
            deposits: Vec::new(),
            game_state: state.tag(),
            last_reset: 1_700_000_000,
            randomness: None,
            end_game_caller: None,
        }
    }

    fn deposit(byte: u8, amount: u64) -> DepositRecord {
        DepositRecord {
            depositor: [byte; 32],
            amount,
            timestamp: 1_700_000_010,
        }
    }

    #[test]
    fn test_decode_inactive_pot() {
        let data = pot(RoundState::Inactive).encode();
        let snapshot = decode_snapshot(&data).unwrap();
        assert_eq!(snapshot, RoundSnapshot::new(RoundState::Inactive, 1_700_000_000));
    }

    #[test]
    fn test_trailing_padding_is_ignored() {
        let mut data = pot(RoundState::Active).encode();
        data.resize(10_240, 0);
        assert_eq!(decode_snapshot(&data).unwrap().state, RoundState::Active);
    }

    #[test]
    fn test_winner_follows_first_randomness_byte() {
        let mut account = pot(RoundState::Cooldown);
        account.deposits = vec![deposit(10, 50_000_000), deposit(11, 60_000_000), deposit(12, 70_000_000)];
        account.total_amount = 180_000_000;
        let mut randomness = [0u8; 32];
        randomness[0] = 7; // 7 % 3 == 1
        account.randomness = Some(randomness);
        account.end_game_caller = Some([5u8; 32]);

        let snapshot = decode_snapshot(&account.encode()).unwrap();
        assert!(snapshot.randomness_available);
        assert_eq!(snapshot.winner, Some(Address::new([11u8; 32])));
        assert_eq!(snapshot.pot_lamports, 180_000_000);
        assert_eq!(snapshot.deposit_count, 3);
        assert_eq!(snapshot.end_round_caller, Some(Address::new([5u8; 32])));
    }

    #[test]
    fn test_randomness_without_deposits_has_no_winner() {
        let mut account = pot(RoundState::Cooldown);
        account.randomness = Some([3u8; 32]);

        let snapshot = decode_snapshot(&account.encode()).unwrap();
        assert!(snapshot.randomness_available);
        assert_eq!(snapshot.winner, None);
    }

    #[test]
    fn test_unknown_state_tag_is_anomaly() {
        let mut account = pot(RoundState::Active);
        account.game_state = 9;
        assert_eq!(decode_snapshot(&account.encode()), Err(Anomaly::UnknownState(9)));
    }

    #[test]
    fn test_wrong_discriminator_is_anomaly() {
        let mut data = pot(RoundState::Active).encode();
        data[0] ^= 0xff;
        assert!(matches!(decode_snapshot(&data), Err(Anomaly::Discriminator(_))));
    }

    #[test]
    fn test_truncated_data_is_anomaly() {
        let data = pot(RoundState::Active).encode();
        assert!(matches!(decode_snapshot(&data[..20]), Err(Anomaly::Malformed(_))));
        assert!(matches!(decode_snapshot(&data[..4]), Err(Anomaly::Malformed(_))));
    }
}
