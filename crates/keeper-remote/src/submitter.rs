use async_trait::async_trait;
use keeper_types::{Address, TransitionCommand};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::program::ProgramErrorCode;

/// Account passed to an instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMeta {
    pub name: String,
    pub address: Address,
    pub writable: bool,
}

impl AccountMeta {
    pub fn writable(name: &str, address: Address) -> Self {
        Self {
            name: name.to_string(),
            address,
            writable: true,
        }
    }

    pub fn readonly(name: &str, address: Address) -> Self {
        Self {
            name: name.to_string(),
            address,
            writable: false,
        }
    }
}

/// One transition instruction ready for signing and submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionRequest {
    pub program_id: Address,
    pub instruction: TransitionCommand,
    pub accounts: Vec<AccountMeta>,
}

impl InstructionRequest {
    pub fn account(&self, name: &str) -> Option<&AccountMeta> {
        self.accounts.iter().find(|a| a.name == name)
    }
}

/// Opaque confirmation of a submitted instruction, kept for audit logs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub signature: String,
    #[serde(default)]
    pub slot: Option<u64>,
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot {
            Some(slot) => write!(f, "{}@{}", self.signature, slot),
            None => f.write_str(&self.signature),
        }
    }
}

/// Why the remote (or the relay in front of it) refused a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The round already moved past the command's precondition
    Precondition {
        code: Option<ProgramErrorCode>,
        message: String,
    },
    /// The submitting identity is not allowed to issue the command
    Unauthorized(String),
    /// The request itself was refused or could not be built
    Invalid(String),
}

impl RejectReason {
    /// Precondition races are expected; anything else needs an operator
    pub fn is_expected_race(&self) -> bool {
        matches!(self, RejectReason::Precondition { .. })
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Precondition {
                code: Some(code),
                message,
            } => write!(f, "precondition not met: {code}: {message}"),
            RejectReason::Precondition { code: None, message } => {
                write!(f, "precondition not met: {message}")
            }
            RejectReason::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            RejectReason::Invalid(msg) => write!(f, "invalid request: {msg}"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("rejected: {0}")]
    Rejected(RejectReason),

    /// Network, timeout or overload; safe to re-plan next cycle
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Capability to sign and submit an instruction.
///
/// Key management lives behind this seam; the keeper never touches keys.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, request: &InstructionRequest) -> Result<Receipt, SubmitError>;
}

#[async_trait]
impl<T: Submitter + ?Sized> Submitter for Arc<T> {
    async fn submit(&self, request: &InstructionRequest) -> Result<Receipt, SubmitError> {
        (**self).submit(request).await
    }
}
