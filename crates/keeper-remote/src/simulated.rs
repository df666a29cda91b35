use async_trait::async_trait;
use keeper_types::{Address, Clock, PayoutPlan, RoundSnapshot, RoundState, TransitionCommand, UnixTimestamp};
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::ReadError;
use crate::pot_layout::{decode_snapshot, DepositRecord, PotAccount};
use crate::program::{ProgramErrorCode, MIN_DEPOSIT_LAMPORTS};
use crate::reader::StateReader;
use crate::submitter::{InstructionRequest, Receipt, RejectReason, SubmitError, Submitter};

/// A transition the simulated program accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTransition {
    pub command: TransitionCommand,
    pub at: UnixTimestamp,
    pub signature: String,
}

struct SimState {
    pot: PotAccount,
    auto_randomness: bool,
    read_failures: u32,
    submit_failures: u32,
    lost_responses: u32,
    submissions: usize,
    history: Vec<AppliedTransition>,
    payouts: Vec<(Address, u64)>,
}

/// In-memory jackpot program enforcing the same preconditions as the
/// deployed one. Serves both snapshot reads and instruction submissions,
/// with knobs for injecting transport failures and corrupt state.
pub struct SimulatedProgram {
    state: Mutex<SimState>,
    clock: Arc<dyn Clock>,
    active_secs: i64,
    cooldown_secs: i64,
    signer: Address,
}

impl SimulatedProgram {
    /// A freshly initialized pot: Inactive, cooldown measured from now
    pub fn new(clock: Arc<dyn Clock>, active_secs: i64, cooldown_secs: i64) -> Self {
        let now = clock.now();
        let pot = PotAccount {
            admin: [0u8; 32],
            bump: 255,
            total_amount: 0,
            deposits: Vec::new(),
            game_state: RoundState::Inactive.tag(),
            last_reset: now,
            randomness: None,
            end_game_caller: None,
        };

        Self {
            state: Mutex::new(SimState {
                pot,
                auto_randomness: true,
                read_failures: 0,
                submit_failures: 0,
                lost_responses: 0,
                submissions: 0,
                history: Vec::new(),
                payouts: Vec::new(),
            }),
            clock,
            active_secs,
            cooldown_secs,
            signer: Address::new([0xAA; 32]),
        }
    }

    /// Identity recorded as the end-round caller
    pub fn with_signer(mut self, signer: Address) -> Self {
        self.signer = signer;
        self
    }

    /// When off, ending a round leaves randomness pending until
    /// [`fulfill_randomness`](Self::fulfill_randomness) is called
    pub fn set_auto_randomness(&self, enabled: bool) {
        self.lock().auto_randomness = enabled;
    }

    pub fn deposit(&self, depositor: Address, amount: u64) -> Result<(), ProgramErrorCode> {
        let now = self.clock.now();
        let mut state = self.lock();
        if state.pot.game_state != RoundState::Active.tag() {
            return Err(ProgramErrorCode::GameInactive);
        }
        if amount < MIN_DEPOSIT_LAMPORTS {
            return Err(ProgramErrorCode::MinDeposit);
        }
        state.pot.deposits.push(DepositRecord {
            depositor: *depositor.as_bytes(),
            amount,
            timestamp: now,
        });
        state.pot.total_amount += amount;
        Ok(())
    }

    pub fn fulfill_randomness(&self, randomness: [u8; 32]) -> Result<(), ProgramErrorCode> {
        let mut state = self.lock();
        if state.pot.game_state != RoundState::Cooldown.tag() {
            return Err(ProgramErrorCode::InvalidState);
        }
        state.pot.randomness = Some(randomness);
        Ok(())
    }

    /// Overwrite the raw state tag, e.g. with a value no known state maps to
    pub fn set_state_tag(&self, tag: u8) {
        self.lock().pot.game_state = tag;
    }

    pub fn fail_next_reads(&self, count: u32) {
        self.lock().read_failures = count;
    }

    /// Refuse the next submissions at the transport level, before any effect
    pub fn fail_next_submits(&self, count: u32) {
        self.lock().submit_failures = count;
    }

    /// Apply the next submissions but report a transport failure
    pub fn lose_next_responses(&self, count: u32) {
        self.lock().lost_responses = count;
    }

    pub fn snapshot(&self) -> Result<RoundSnapshot, ReadError> {
        let data = self.lock().pot.encode();
        decode_snapshot(&data).map_err(ReadError::from)
    }

    pub fn history(&self) -> Vec<AppliedTransition> {
        self.lock().history.clone()
    }

    pub fn payouts(&self) -> Vec<(Address, u64)> {
        self.lock().payouts.clone()
    }

    /// Every submission attempt, accepted or not
    pub fn submissions(&self) -> usize {
        self.lock().submissions
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(
        &self,
        state: &mut SimState,
        request: &InstructionRequest,
        now: UnixTimestamp,
    ) -> Result<(), SubmitError> {
        let pot = &mut state.pot;
        let current = RoundState::from_tag(pot.game_state);
        let elapsed = now.saturating_sub(pot.last_reset);

        match request.instruction {
            TransitionCommand::StartRound => {
                require(current == Some(RoundState::Inactive), ProgramErrorCode::InvalidState)?;
                require(elapsed >= self.cooldown_secs, ProgramErrorCode::CooldownActive)?;
                pot.game_state = RoundState::Active.tag();
                pot.last_reset = now;
            }
            TransitionCommand::EndRound => {
                require(current == Some(RoundState::Active), ProgramErrorCode::InvalidState)?;
                require(elapsed >= self.active_secs, ProgramErrorCode::CooldownActive)?;
                if state.auto_randomness {
                    pot.randomness = Some(pseudo_randomness(pot, now));
                }
                pot.end_game_caller = Some(*self.signer.as_bytes());
                pot.game_state = RoundState::Cooldown.tag();
                pot.last_reset = now;
            }
            TransitionCommand::DistributeRewards => {
                require(current == Some(RoundState::Cooldown), ProgramErrorCode::InvalidState)?;
                require(pot.randomness.is_some(), ProgramErrorCode::RandomnessNotAvailable)?;
                require(pot.total_amount > 0, ProgramErrorCode::NoDeposits)?;

                let winner = pot.winner().ok_or_else(|| invalid("no winner resolvable"))?;
                let named = |name: &str| {
                    request
                        .account(name)
                        .map(|a| a.address)
                        .ok_or_else(|| invalid(&format!("missing {name} account")))
                };
                if named("winner")? != winner {
                    return Err(invalid("winner account does not match randomness"));
                }
                let caller = pot
                    .end_game_caller
                    .map(Address::new)
                    .ok_or_else(|| invalid("no end-round caller recorded"))?;
                if named("caller")? != caller {
                    return Err(invalid("caller account does not match end-round caller"));
                }

                let plan = PayoutPlan::for_pot(pot.total_amount);
                state.payouts.push((winner, plan.winner));
                state.payouts.push((named("buyback")?, plan.buyback));
                state.payouts.push((named("fee")?, plan.fee));
                state.payouts.push((caller, plan.caller_bonus));
                reset(pot, now);
            }
            TransitionCommand::ResetIfNoWinner => {
                require(current == Some(RoundState::Cooldown), ProgramErrorCode::InvalidState)?;
                require(pot.randomness.is_some(), ProgramErrorCode::RandomnessNotAvailable)?;
                require(pot.deposits.is_empty(), ProgramErrorCode::InvalidState)?;
                reset(pot, now);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl StateReader for SimulatedProgram {
    async fn fetch(&self) -> Result<RoundSnapshot, ReadError> {
        {
            let mut state = self.lock();
            if state.read_failures > 0 {
                state.read_failures -= 1;
                return Err(ReadError::Unavailable("simulated outage".to_string()));
            }
        }
        self.snapshot()
    }
}

#[async_trait]
impl Submitter for SimulatedProgram {
    async fn submit(&self, request: &InstructionRequest) -> Result<Receipt, SubmitError> {
        let now = self.clock.now();
        let mut state = self.lock();
        state.submissions += 1;

        if state.submit_failures > 0 {
            state.submit_failures -= 1;
            return Err(SubmitError::Transport("simulated connection reset".to_string()));
        }

        self.apply(&mut state, request, now)?;

        let signature = format!("sim-{}", state.submissions);
        state.history.push(AppliedTransition {
            command: request.instruction,
            at: now,
            signature: signature.clone(),
        });

        if state.lost_responses > 0 {
            state.lost_responses -= 1;
            return Err(SubmitError::Transport("simulated response timeout".to_string()));
        }

        Ok(Receipt {
            signature,
            slot: Some(state.submissions as u64),
        })
    }
}

fn require(condition: bool, code: ProgramErrorCode) -> Result<(), SubmitError> {
    if condition {
        Ok(())
    } else {
        Err(SubmitError::Rejected(RejectReason::Precondition {
            code: Some(code),
            message: code.name().to_string(),
        }))
    }
}

fn invalid(message: &str) -> SubmitError {
    SubmitError::Rejected(RejectReason::Invalid(message.to_string()))
}

fn reset(pot: &mut PotAccount, now: UnixTimestamp) {
    pot.game_state = RoundState::Inactive.tag();
    pot.total_amount = 0;
    pot.deposits.clear();
    pot.randomness = None;
    pot.end_game_caller = None;
    pot.last_reset = now;
}

/// Hash of pot-local data, the same inputs the program mixes in
fn pseudo_randomness(pot: &PotAccount, now: UnixTimestamp) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(now.to_le_bytes());
    hasher.update(pot.total_amount.to_le_bytes());
    hasher.update([pot.bump]);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submitter::AccountMeta;
    use keeper_types::ManualClock;

    const T0: UnixTimestamp = 1_700_000_000;

    fn program() -> (ManualClock, SimulatedProgram) {
        let clock = ManualClock::new(T0);
        let sim = SimulatedProgram::new(Arc::new(clock.clone()), 120, 360);
        (clock, sim)
    }

    fn request(command: TransitionCommand) -> InstructionRequest {
        InstructionRequest {
            program_id: Address::new([1u8; 32]),
            instruction: command,
            accounts: vec![AccountMeta::writable("pot", Address::new([2u8; 32]))],
        }
    }

    fn precondition(code: ProgramErrorCode) -> SubmitError {
        SubmitError::Rejected(RejectReason::Precondition {
            code: Some(code),
            message: code.name().to_string(),
        })
    }

    #[tokio::test]
    async fn test_start_round_respects_cooldown() {
        let (clock, sim) = program();
        clock.advance(359);
        assert_eq!(
            sim.submit(&request(TransitionCommand::StartRound)).await,
            Err(precondition(ProgramErrorCode::CooldownActive))
        );
        clock.advance(1);
        assert!(sim.submit(&request(TransitionCommand::StartRound)).await.is_ok());
        assert_eq!(sim.fetch().await.unwrap().state, RoundState::Active);
    }

    #[tokio::test]
    async fn test_repeated_command_is_rejected_without_effect() {
        let (clock, sim) = program();
        clock.advance(360);
        sim.submit(&request(TransitionCommand::StartRound)).await.unwrap();
        let after_first = sim.snapshot().unwrap();

        assert_eq!(
            sim.submit(&request(TransitionCommand::StartRound)).await,
            Err(precondition(ProgramErrorCode::InvalidState))
        );
        assert_eq!(sim.snapshot().unwrap(), after_first);
        assert_eq!(sim.history().len(), 1);
        assert_eq!(sim.submissions(), 2);
    }

    #[tokio::test]
    async fn test_deposit_rules() {
        let (clock, sim) = program();
        let player = Address::new([5u8; 32]);
        assert_eq!(sim.deposit(player, MIN_DEPOSIT_LAMPORTS), Err(ProgramErrorCode::GameInactive));

        clock.advance(360);
        sim.submit(&request(TransitionCommand::StartRound)).await.unwrap();
        assert_eq!(sim.deposit(player, 1), Err(ProgramErrorCode::MinDeposit));
        sim.deposit(player, MIN_DEPOSIT_LAMPORTS).unwrap();

        let snapshot = sim.snapshot().unwrap();
        assert_eq!(snapshot.pot_lamports, MIN_DEPOSIT_LAMPORTS);
        assert_eq!(snapshot.deposit_count, 1);
    }

    #[tokio::test]
    async fn test_reset_refused_when_deposits_exist() {
        let (clock, sim) = program();
        clock.advance(360);
        sim.submit(&request(TransitionCommand::StartRound)).await.unwrap();
        sim.deposit(Address::new([5u8; 32]), MIN_DEPOSIT_LAMPORTS).unwrap();
        clock.advance(120);
        sim.submit(&request(TransitionCommand::EndRound)).await.unwrap();

        assert_eq!(
            sim.submit(&request(TransitionCommand::ResetIfNoWinner)).await,
            Err(precondition(ProgramErrorCode::InvalidState))
        );
    }

    #[tokio::test]
    async fn test_pending_randomness_blocks_payout() {
        let (clock, sim) = program();
        sim.set_auto_randomness(false);
        clock.advance(360);
        sim.submit(&request(TransitionCommand::StartRound)).await.unwrap();
        clock.advance(120);
        sim.submit(&request(TransitionCommand::EndRound)).await.unwrap();

        let snapshot = sim.snapshot().unwrap();
        assert_eq!(snapshot.state, RoundState::Cooldown);
        assert!(!snapshot.randomness_available);
        assert_eq!(
            sim.submit(&request(TransitionCommand::ResetIfNoWinner)).await,
            Err(precondition(ProgramErrorCode::RandomnessNotAvailable))
        );

        sim.fulfill_randomness([0u8; 32]).unwrap();
        assert!(sim.submit(&request(TransitionCommand::ResetIfNoWinner)).await.is_ok());
        assert_eq!(sim.snapshot().unwrap().state, RoundState::Inactive);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let (_clock, sim) = program();
        sim.fail_next_reads(1);
        assert!(matches!(sim.fetch().await, Err(ReadError::Unavailable(_))));
        assert!(sim.fetch().await.is_ok());

        sim.set_state_tag(7);
        assert!(matches!(sim.fetch().await, Err(ReadError::Anomaly(_))));
    }
}
