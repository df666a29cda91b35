//! Turns a planned [`TransitionCommand`] into exactly one submission and
//! classifies what came back.

use keeper_types::{Address, PayoutPlan, RoundSnapshot, TransitionCommand};
use std::fmt;
use std::sync::Arc;

use crate::program::SYSTEM_PROGRAM;
use crate::submitter::{AccountMeta, InstructionRequest, Receipt, RejectReason, SubmitError, Submitter};

/// Classified result of one execution attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Confirmed(Receipt),
    Rejected(RejectReason),
    TransientError(String),
}

impl Outcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Outcome::Confirmed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Confirmed(_) => "confirmed",
            Outcome::Rejected(_) => "rejected",
            Outcome::TransientError(_) => "transient_error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Confirmed(receipt) => write!(f, "confirmed {receipt}"),
            Outcome::Rejected(reason) => write!(f, "rejected: {reason}"),
            Outcome::TransientError(msg) => write!(f, "transient error: {msg}"),
        }
    }
}

/// Fixed accounts the transition instructions reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramAccounts {
    pub program_id: Address,
    pub pot: Address,
    pub buyback: Option<Address>,
    pub fee: Option<Address>,
}

pub struct TransitionExecutor {
    submitter: Arc<dyn Submitter>,
    accounts: ProgramAccounts,
}

impl TransitionExecutor {
    pub fn new(submitter: Arc<dyn Submitter>, accounts: ProgramAccounts) -> Self {
        Self {
            submitter,
            accounts,
        }
    }

    /// Submit `command` once. Never retries within the call.
    pub async fn execute(&self, command: TransitionCommand, snapshot: &RoundSnapshot) -> Outcome {
        let request = match self.build_request(command, snapshot) {
            Ok(request) => request,
            Err(reason) => return Outcome::Rejected(reason),
        };

        if command == TransitionCommand::DistributeRewards {
            let plan = PayoutPlan::for_pot(snapshot.pot_lamports);
            tracing::info!(
                pot_lamports = plan.total,
                winner_lamports = plan.winner,
                buyback_lamports = plan.buyback,
                fee_lamports = plan.fee,
                caller_lamports = plan.caller_bonus,
                "expected reward distribution"
            );
        }

        tracing::debug!(
            instruction = %command,
            accounts = request.accounts.len(),
            "submitting instruction"
        );

        match self.submitter.submit(&request).await {
            Ok(receipt) => Outcome::Confirmed(receipt),
            Err(SubmitError::Rejected(reason)) => Outcome::Rejected(reason),
            Err(SubmitError::Transport(msg)) => Outcome::TransientError(msg),
        }
    }

    /// Assemble the instruction accounts for `command`.
    ///
    /// Reward distribution needs the winner and the end-round caller from the
    /// snapshot plus the configured buyback and fee recipients; a missing
    /// account refuses the command locally without submitting anything.
    pub fn build_request(
        &self,
        command: TransitionCommand,
        snapshot: &RoundSnapshot,
    ) -> Result<InstructionRequest, RejectReason> {
        let mut accounts = vec![AccountMeta::writable("pot", self.accounts.pot)];

        if command == TransitionCommand::DistributeRewards {
            let winner = snapshot
                .winner
                .ok_or_else(|| RejectReason::Invalid("snapshot has no winner".to_string()))?;
            let caller = snapshot.end_round_caller.ok_or_else(|| {
                RejectReason::Invalid("snapshot has no end-round caller".to_string())
            })?;
            let buyback = self.accounts.buyback.ok_or_else(|| {
                RejectReason::Invalid("buyback address not configured".to_string())
            })?;
            let fee = self
                .accounts
                .fee
                .ok_or_else(|| RejectReason::Invalid("fee address not configured".to_string()))?;

            accounts.push(AccountMeta::writable("winner", winner));
            accounts.push(AccountMeta::writable("buyback", buyback));
            accounts.push(AccountMeta::writable("fee", fee));
            accounts.push(AccountMeta::writable("caller", caller));
        }

        accounts.push(AccountMeta::readonly("system_program", SYSTEM_PROGRAM));

        Ok(InstructionRequest {
            program_id: self.accounts.program_id,
            instruction: command,
            accounts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use keeper_types::RoundState;
    use std::sync::Mutex;

    /// Replays canned results and records every request
    struct ScriptedSubmitter {
        results: Mutex<Vec<Result<Receipt, SubmitError>>>,
        seen: Mutex<Vec<InstructionRequest>>,
    }

    impl ScriptedSubmitter {
        fn new(results: Vec<Result<Receipt, SubmitError>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Submitter for ScriptedSubmitter {
        async fn submit(&self, request: &InstructionRequest) -> Result<Receipt, SubmitError> {
            self.seen.lock().unwrap().push(request.clone());
            self.results.lock().unwrap().remove(0)
        }
    }

    fn accounts() -> ProgramAccounts {
        ProgramAccounts {
            program_id: Address::new([1u8; 32]),
            pot: Address::new([2u8; 32]),
            buyback: Some(Address::new([3u8; 32])),
            fee: Some(Address::new([4u8; 32])),
        }
    }

    fn receipt() -> Receipt {
        Receipt {
            signature: "sig".to_string(),
            slot: Some(1),
        }
    }

    #[tokio::test]
    async fn test_confirmed() {
        let submitter = ScriptedSubmitter::new(vec![Ok(receipt())]);
        let executor = TransitionExecutor::new(submitter.clone(), accounts());
        let snapshot = RoundSnapshot::new(RoundState::Inactive, 0);

        let outcome = executor.execute(TransitionCommand::StartRound, &snapshot).await;
        assert_eq!(outcome, Outcome::Confirmed(receipt()));

        let seen = submitter.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].instruction, TransitionCommand::StartRound);
        assert_eq!(seen[0].account("pot").unwrap().address, Address::new([2u8; 32]));
    }

    #[tokio::test]
    async fn test_transport_failure_is_transient() {
        let submitter = ScriptedSubmitter::new(vec![Err(SubmitError::Transport("timeout".into()))]);
        let executor = TransitionExecutor::new(submitter.clone(), accounts());
        let snapshot = RoundSnapshot::new(RoundState::Active, 0);

        let outcome = executor.execute(TransitionCommand::EndRound, &snapshot).await;
        assert_eq!(outcome, Outcome::TransientError("timeout".to_string()));
        // No retry inside the same attempt
        assert_eq!(submitter.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_distribute_wires_all_recipients() {
        let submitter = ScriptedSubmitter::new(vec![Ok(receipt())]);
        let executor = TransitionExecutor::new(submitter.clone(), accounts());
        let snapshot = RoundSnapshot::new(RoundState::Cooldown, 0)
            .with_pot(100_000_000, 2)
            .with_randomness(Some(Address::new([8u8; 32])))
            .with_end_round_caller(Address::new([9u8; 32]));

        let outcome = executor.execute(TransitionCommand::DistributeRewards, &snapshot).await;
        assert!(outcome.is_confirmed());

        let seen = submitter.seen.lock().unwrap();
        let names: Vec<&str> = seen[0].accounts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["pot", "winner", "buyback", "fee", "caller", "system_program"]);
        assert_eq!(seen[0].account("winner").unwrap().address, Address::new([8u8; 32]));
        assert_eq!(seen[0].account("caller").unwrap().address, Address::new([9u8; 32]));
    }

    #[tokio::test]
    async fn test_distribute_without_fee_address_is_refused_locally() {
        let submitter = ScriptedSubmitter::new(Vec::new());
        let mut accounts = accounts();
        accounts.fee = None;
        let executor = TransitionExecutor::new(submitter.clone(), accounts);
        let snapshot = RoundSnapshot::new(RoundState::Cooldown, 0)
            .with_randomness(Some(Address::new([8u8; 32])))
            .with_end_round_caller(Address::new([9u8; 32]));

        let outcome = executor.execute(TransitionCommand::DistributeRewards, &snapshot).await;
        assert!(matches!(outcome, Outcome::Rejected(RejectReason::Invalid(_))));
        assert!(submitter.seen.lock().unwrap().is_empty());
    }
}
