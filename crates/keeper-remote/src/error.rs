use keeper_types::Address;
use thiserror::Error;

/// Snapshot shape problems. Never mapped onto a guessed state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Anomaly {
    #[error("pot account does not exist")]
    AccountMissing,

    #[error("pot account owned by {actual}, expected {expected}")]
    OwnerMismatch { expected: Address, actual: Address },

    #[error("account discriminator mismatch: {0}")]
    Discriminator(String),

    #[error("unrecognized round state tag {0}")]
    UnknownState(u8),

    #[error("malformed account data: {0}")]
    Malformed(String),
}

/// Failure of a single snapshot read
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadError {
    /// Transport-level failure; retried next cycle
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The remote answered with something we cannot interpret
    #[error("snapshot anomaly: {0}")]
    Anomaly(#[from] Anomaly),
}

/// Errors constructing remote clients (startup only)
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Address error: {0}")]
    Address(#[from] keeper_types::KeeperError),
}

pub type Result<T> = std::result::Result<T, RemoteError>;
