//! Wiring for the `jackpot-keeper` binary: configuration, logging setup and
//! construction of the keeper loop against a live or simulated program.

pub mod config;
pub mod error;
pub mod service;
pub mod telemetry;

pub use config::{ConfigError, KeeperConfig};
pub use error::{Result, ServiceError};
pub use service::{Backend, KeeperService};
pub use telemetry::{init_tracing, LogFormat};
