//! The escrow program: single writer over store, balances and journal.
//!
//! Every mutation enters through [`EscrowProgram::execute`] (or
//! [`EscrowProgram::execute_signed`]), which takes `&mut self`, so two
//! instructions can never interleave on the same record.

use escrowpay_ledger::{AgreementStore, BalanceManager};
use escrowpay_types::{
    Address, AgreementId, AgreementRef, Instruction, PaymentAgreement, ProgramConfig, Receipt,
    Result, SignedInstruction,
};

use crate::clock::{Clock, SystemClock};
use crate::handlers::{self, Context};
use crate::replay_guard::ReplayGuard;

/// An escrow program instance with its hosting-runtime state.
pub struct EscrowProgram<C: Clock = SystemClock> {
    config: ProgramConfig,
    store: AgreementStore,
    balances: BalanceManager,
    /// Append-only, one receipt per successful instruction.
    journal: Vec<Receipt>,
    replay: ReplayGuard,
    clock: C,
}

impl EscrowProgram<SystemClock> {
    /// # Errors
    /// `Configuration` if `config` fails validation.
    pub fn new(config: ProgramConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> EscrowProgram<C> {
    /// # Errors
    /// `Configuration` if `config` fails validation.
    pub fn with_clock(config: ProgramConfig, clock: C) -> Result<Self> {
        config.validate()?;
        let replay = ReplayGuard::new(config.replay_cache_size)?;
        tracing::info!(
            program = %config.program_id,
            deposit = config.storage_deposit(),
            max_name_len = config.max_name_len,
            "Escrow program initialised"
        );
        Ok(Self {
            config,
            store: AgreementStore::new(),
            balances: BalanceManager::new(),
            journal: Vec::new(),
            replay,
            clock,
        })
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Run `instruction` on behalf of an already-authenticated `signer`.
    ///
    /// On success the receipt is appended to the journal and returned. On
    /// failure nothing changes.
    ///
    /// # Errors
    /// Whatever the instruction's handler rejects with.
    pub fn execute(&mut self, signer: Address, instruction: Instruction) -> Result<Receipt> {
        let kind = instruction.kind();
        let mut ctx = Context {
            config: &self.config,
            store: &mut self.store,
            balances: &mut self.balances,
            signer,
            now: self.clock.now(),
        };

        let outcome = match instruction {
            Instruction::CreateAgreement(terms) => handlers::create_agreement(&mut ctx, terms),
            Instruction::Approve(target) => handlers::approve(&mut ctx, &target),
            Instruction::Cancel(target) => handlers::cancel(&mut ctx, &target),
            Instruction::RefereeComplete(target) => handlers::referee_complete(&mut ctx, &target),
            Instruction::RefereeCancel(target) => handlers::referee_cancel(&mut ctx, &target),
            Instruction::WithdrawExpired(target) => handlers::withdraw_expired(&mut ctx, &target),
        };

        match outcome {
            Ok(receipt) => {
                self.journal.push(receipt.clone());
                Ok(receipt)
            }
            Err(e) => {
                tracing::debug!(
                    signer = %signer,
                    action = %kind,
                    code = e.code(),
                    error = %e,
                    "Instruction rejected"
                );
                Err(e)
            }
        }
    }

    /// Verify, replay-check, and run a signed instruction. The nonce is
    /// consumed only if the instruction succeeds.
    ///
    /// # Errors
    /// `InvalidSignature`, `SignatureReplayed`, or the handler's error.
    pub fn execute_signed(&mut self, signed: &SignedInstruction) -> Result<Receipt> {
        signed.verify(&self.config.program_id)?;
        if let Err(e) = self.replay.check(signed.signer, signed.nonce) {
            tracing::warn!(
                signer = %signed.signer,
                nonce = signed.nonce,
                "Replayed instruction rejected"
            );
            return Err(e);
        }
        let receipt = self.execute(signed.signer, signed.instruction.clone())?;
        self.replay.mark(signed.signer, signed.nonce);
        Ok(receipt)
    }

    // -----------------------------------------------------------------------
    // Funding
    // -----------------------------------------------------------------------

    /// Credit native units to a wallet from outside the program.
    ///
    /// # Errors
    /// `BalanceOverflow`.
    pub fn fund(&mut self, address: Address, amount: u64) -> Result<()> {
        self.balances.fund(address, amount)
    }

    /// Debit native units from a wallet out of the program.
    ///
    /// # Errors
    /// `InsufficientFunds`.
    pub fn withdraw(&mut self, address: Address, amount: u64) -> Result<()> {
        self.balances.withdraw(address, amount)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn config(&self) -> &ProgramConfig {
        &self.config
    }

    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub fn agreement(&self, id: &AgreementId) -> Option<&PaymentAgreement> {
        self.store.get(id)
    }

    /// Look up a live agreement by its (payer, name) seeds.
    #[must_use]
    pub fn find(&self, payer: Address, name: &str) -> Option<&PaymentAgreement> {
        self.store.get(&AgreementRef::new(payer, name).id(&self.config.program_id))
    }

    #[must_use]
    pub fn agreements_by_payer(&self, payer: &Address) -> Vec<&PaymentAgreement> {
        self.store.by_payer(payer)
    }

    #[must_use]
    pub fn agreements_by_receiver(&self, receiver: &Address) -> Vec<&PaymentAgreement> {
        self.store.by_receiver(receiver)
    }

    #[must_use]
    pub fn agreements_by_referee(&self, referee: &Address) -> Vec<&PaymentAgreement> {
        self.store.by_referee(referee)
    }

    #[must_use]
    pub fn agreement_count(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn balance(&self, address: &Address) -> u64 {
        self.balances.balance(address)
    }

    /// Native units held for a live agreement (amount plus storage deposit).
    #[must_use]
    pub fn custody(&self, id: &AgreementId) -> u64 {
        self.balances.custody(id)
    }

    #[must_use]
    pub fn receipts(&self) -> &[Receipt] {
        &self.journal
    }

    /// Receipts for one agreement id, oldest first. Spans re-creations of
    /// the same (payer, name).
    pub fn receipts_for<'s>(
        &'s self,
        id: &'s AgreementId,
    ) -> impl Iterator<Item = &'s Receipt> + 's {
        self.journal.iter().filter(move |r| r.agreement_id == *id)
    }

    /// Supply conservation check. `execute` does not run it; callers invoke
    /// it on demand.
    ///
    /// # Errors
    /// `SupplyInvariantViolation` if native units were created or destroyed.
    pub fn verify_supply(&self) -> Result<()> {
        self.balances.verify_supply()
    }
}
