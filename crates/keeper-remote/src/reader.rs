use async_trait::async_trait;
use keeper_types::RoundSnapshot;
use std::sync::Arc;

use crate::error::ReadError;

/// Source of round snapshots.
///
/// Implementations must fail explicitly when the remote cannot be read and
/// must not cache across calls.
#[async_trait]
pub trait StateReader: Send + Sync {
    /// Fetch the current round snapshot
    async fn fetch(&self) -> Result<RoundSnapshot, ReadError>;
}

#[async_trait]
impl<T: StateReader + ?Sized> StateReader for Arc<T> {
    async fn fetch(&self) -> Result<RoundSnapshot, ReadError> {
        (**self).fetch().await
    }
}
