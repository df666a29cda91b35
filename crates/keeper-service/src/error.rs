use thiserror::Error;

use crate::config::ConfigError;

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Startup failures; the keeper loop itself never returns an error
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Remote client error: {0}")]
    Remote(#[from] keeper_remote::RemoteError),

    #[error("Address derivation failed: {0}")]
    Address(#[from] keeper_types::KeeperError),
}
