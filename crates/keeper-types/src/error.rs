use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeeperError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Seed of {0} bytes exceeds the 32 byte limit")]
    MaxSeedLengthExceeded(usize),

    #[error("Seeds resolve to an address on the ed25519 curve")]
    InvalidSeeds,

    #[error("Address derivation failed: {0}")]
    AddressDerivation(String),
}

pub type Result<T> = std::result::Result<T, KeeperError>;
