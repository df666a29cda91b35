use keeper_types::Address;
use sha2::{Digest, Sha256};
use std::fmt;

/// The system program, `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM: Address = Address::new([0u8; 32]);

/// Name of the pot account type as registered by the program
pub const POT_ACCOUNT_NAME: &str = "Pot";

/// Minimum deposit accepted by the program, in lamports
pub const MIN_DEPOSIT_LAMPORTS: u64 = 50_000_000;

/// First 8 bytes of `sha256("account:<name>")`
pub fn account_discriminator(name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("account:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Custom error codes raised by the program (offset 6000)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramErrorCode {
    GameInactive = 6000,
    MinDeposit = 6001,
    InvalidState = 6002,
    CooldownActive = 6003,
    NoDeposits = 6004,
    RandomnessNotAvailable = 6005,
}

impl ProgramErrorCode {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            6000 => Some(ProgramErrorCode::GameInactive),
            6001 => Some(ProgramErrorCode::MinDeposit),
            6002 => Some(ProgramErrorCode::InvalidState),
            6003 => Some(ProgramErrorCode::CooldownActive),
            6004 => Some(ProgramErrorCode::NoDeposits),
            6005 => Some(ProgramErrorCode::RandomnessNotAvailable),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            ProgramErrorCode::GameInactive => "GameInactive",
            ProgramErrorCode::MinDeposit => "MinDeposit",
            ProgramErrorCode::InvalidState => "InvalidState",
            ProgramErrorCode::CooldownActive => "CooldownActive",
            ProgramErrorCode::NoDeposits => "NoDeposits",
            ProgramErrorCode::RandomnessNotAvailable => "RandomnessNotAvailable",
        }
    }
}

impl fmt::Display for ProgramErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}
