//! Boundary to the remote jackpot program: reading the pot account and
//! submitting transition instructions.

/// Program constants: discriminators, error codes, well-known accounts
pub mod program;
/// Anchor/Borsh layout of the pot account
pub mod pot_layout;
/// Snapshot source seam
pub mod reader;
/// JSON-RPC snapshot reader
pub mod rpc;
/// Command submission seam and instruction payloads
pub mod submitter;
/// HTTP signing-relay submitter
pub mod relay;
/// Command execution with outcome classification
pub mod executor;
/// In-memory stand-in for the remote program
pub mod simulated;

mod error;

pub use error::{Anomaly, ReadError, RemoteError, Result};
pub use executor::{Outcome, ProgramAccounts, TransitionExecutor};
pub use program::ProgramErrorCode;
pub use reader::StateReader;
pub use relay::RelaySubmitter;
pub use rpc::RpcStateReader;
pub use simulated::SimulatedProgram;
pub use submitter::{
    AccountMeta, InstructionRequest, Receipt, RejectReason, SubmitError, Submitter,
};
