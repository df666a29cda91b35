//! The keeper's cooperative poll loop: read the round, plan, execute at most
//! one transition, sleep, repeat until cancelled.

mod scheduler;
mod stats;

pub use scheduler::{CycleOutcome, Scheduler, SchedulerPhase, SchedulerSettings};
pub use stats::SchedulerStats;
