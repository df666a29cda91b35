use keeper_planner::{RoundDurations, TransitionPlanner};
use keeper_remote::{
    ProgramAccounts, RelaySubmitter, RpcStateReader, SimulatedProgram, StateReader, Submitter,
    TransitionExecutor,
};
use keeper_scheduler::{CycleOutcome, Scheduler, SchedulerSettings, SchedulerStats};
use keeper_types::{pot_address, Address, Clock, SystemClock};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::KeeperConfig;
use crate::error::Result;

/// Where snapshots come from and where commands go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// JSON-RPC reads, relay submissions
    Live,
    /// In-process program, nothing leaves the machine
    Simulated,
}

/// Fully wired keeper, ready to run
pub struct KeeperService {
    scheduler: Scheduler,
    pot: Address,
    simulation: Option<Arc<SimulatedProgram>>,
}

impl KeeperService {
    pub fn build(config: &KeeperConfig, backend: Backend) -> Result<Self> {
        Self::build_with_clock(config, backend, Arc::new(SystemClock))
    }

    /// Validate `config`, derive the pot address and construct every
    /// component. Any failure here is fatal to startup.
    pub fn build_with_clock(
        config: &KeeperConfig,
        backend: Backend,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        if backend == Backend::Live {
            config.require_payout_addresses()?;
        }

        let program_id = config.program_id()?;
        let (pot, bump) = pot_address(&program_id)?;
        let accounts = ProgramAccounts {
            program_id,
            pot,
            buyback: config.buyback()?,
            fee: config.fee()?,
        };
        if accounts.buyback.is_none() || accounts.fee.is_none() {
            warn!("simulating without buyback or fee address, reward distribution will be refused");
        }

        let durations = RoundDurations::new(
            config.active_duration_secs as i64,
            config.cooldown_duration_secs as i64,
        );

        let reader: Arc<dyn StateReader>;
        let submitter: Arc<dyn Submitter>;
        let simulation = match backend {
            Backend::Live => {
                reader = Arc::new(RpcStateReader::new(
                    config.rpc_url.clone(),
                    program_id,
                    pot,
                    config.commitment.clone(),
                    config.call_timeout(),
                )?);
                submitter = Arc::new(RelaySubmitter::new(
                    config.relay_url.clone(),
                    config.relay_token.clone(),
                    config.call_timeout(),
                )?);
                None
            }
            Backend::Simulated => {
                let sim = Arc::new(SimulatedProgram::new(
                    clock.clone(),
                    durations.active_secs,
                    durations.cooldown_secs,
                ));
                reader = sim.clone();
                submitter = sim.clone();
                Some(sim)
            }
        };

        info!(
            program_id = %program_id,
            pot = %pot,
            bump,
            backend = ?backend,
            rpc_url = %config.rpc_url,
            relay_url = %config.relay_url,
            "keeper configured"
        );

        let settings = SchedulerSettings {
            poll_interval: config.poll_interval(),
            call_timeout: config.call_timeout(),
            failure_alert_threshold: config.failure_alert_threshold,
        };
        let scheduler = Scheduler::new(
            reader,
            TransitionPlanner::new(durations),
            TransitionExecutor::new(submitter, accounts),
            clock,
            settings,
        );

        Ok(Self {
            scheduler,
            pot,
            simulation,
        })
    }

    pub fn pot(&self) -> Address {
        self.pot
    }

    /// The in-process program when running with [`Backend::Simulated`]
    pub fn simulation(&self) -> Option<&Arc<SimulatedProgram>> {
        self.simulation.as_ref()
    }

    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.scheduler.run_cycle().await
    }

    pub async fn run(mut self, cancel: CancellationToken) -> SchedulerStats {
        self.scheduler.run(cancel).await
    }
}
