//! Fixtures for driving keepers against the simulated program on a manual
//! clock.

use async_trait::async_trait;
use keeper_planner::{RoundDurations, TransitionPlanner};
use keeper_remote::{
    ProgramAccounts, ReadError, SimulatedProgram, StateReader, TransitionExecutor,
};
use keeper_scheduler::{Scheduler, SchedulerSettings};
use keeper_types::{Address, ManualClock, RoundSnapshot};
use std::sync::{Arc, Mutex};

pub const START: i64 = 1_700_000_000;
pub const TICK_SECS: i64 = 5;

pub struct Harness {
    pub clock: ManualClock,
    pub program: Arc<SimulatedProgram>,
    pub accounts: ProgramAccounts,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        let clock = ManualClock::new(START);
        let durations = RoundDurations::default();
        let program = Arc::new(SimulatedProgram::new(
            Arc::new(clock.clone()),
            durations.active_secs,
            durations.cooldown_secs,
        ));
        let accounts = ProgramAccounts {
            program_id: Address::new([1u8; 32]),
            pot: Address::new([2u8; 32]),
            buyback: Some(Address::new([3u8; 32])),
            fee: Some(Address::new([4u8; 32])),
        };

        Self {
            clock,
            program,
            accounts,
        }
    }

    /// Keeper reading straight from the program
    pub fn keeper(&self) -> Scheduler {
        self.keeper_with_reader(self.program.clone())
    }

    pub fn keeper_with_reader(&self, reader: Arc<dyn StateReader>) -> Scheduler {
        Scheduler::new(
            reader,
            TransitionPlanner::default(),
            TransitionExecutor::new(self.program.clone(), self.accounts.clone()),
            Arc::new(self.clock.clone()),
            SchedulerSettings::default(),
        )
    }

    pub fn tick(&self) {
        self.clock.advance(TICK_SECS);
    }
}

pub fn player(n: u8) -> Address {
    Address::new([0x10 + n; 32])
}

/// Reader that always answers with the snapshot it saw on the previous call,
/// like an RPC node lagging one poll behind
pub struct LaggingReader {
    inner: Arc<SimulatedProgram>,
    previous: Mutex<Option<RoundSnapshot>>,
}

impl LaggingReader {
    pub fn new(inner: Arc<SimulatedProgram>) -> Self {
        Self {
            inner,
            previous: Mutex::new(None),
        }
    }
}

#[async_trait]
impl StateReader for LaggingReader {
    async fn fetch(&self) -> Result<RoundSnapshot, ReadError> {
        let fresh = self.inner.fetch().await?;
        let mut previous = self
            .previous
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(previous.replace(fresh.clone()).unwrap_or(fresh))
    }
}
