//! Instruction handlers.
//!
//! One function per instruction. Each handler runs every check before its
//! first write, so an `Err` leaves store and balances exactly as they were.
//! Terminal transitions disburse custody, set the terminal flag on the
//! record, and delete it; the flagged copy is returned inside the receipt.

use escrowpay_ledger::{AgreementStore, BalanceManager, FundTransferExecutor};
use escrowpay_types::{
    Address, AgreementId, AgreementRef, AgreementTerms, EscrowError, InstructionKind, Party,
    PaymentAgreement, ProgramConfig, Receipt, ReceiptType, Result, Timestamp,
};

use crate::guard;

/// Everything a handler may read or write, bound to one instruction.
pub struct Context<'a> {
    pub config: &'a ProgramConfig,
    pub store: &'a mut AgreementStore,
    pub balances: &'a mut BalanceManager,
    /// Verified signer of the instruction.
    pub signer: Address,
    /// Time observed once at dispatch.
    pub now: Timestamp,
}

// ---------------------------------------------------------------------------
// CreateAgreement
// ---------------------------------------------------------------------------

/// Create a pending agreement with `signer` as payer and move
/// `amount + storage deposit` into custody.
///
/// # Errors
/// In check order: `AgreementAlreadyExists`, `InvalidName`, `ZeroAmount`,
/// `PayerCannotBeReceiver`, `RefereeCannotBePayer`, `RefereeCannotBeReceiver`,
/// `ExpirationMustBeInFuture`, `InsufficientFunds`.
pub fn create_agreement(ctx: &mut Context<'_>, terms: AgreementTerms) -> Result<Receipt> {
    let payer = ctx.signer;
    let id = AgreementId::derive(&ctx.config.program_id, &payer, &terms.name);
    if ctx.store.contains(&id) {
        return Err(EscrowError::AgreementAlreadyExists(id));
    }

    let len = terms.name.len();
    if len == 0 || len > ctx.config.max_name_len {
        return Err(EscrowError::InvalidName {
            len,
            max: ctx.config.max_name_len,
        });
    }
    if terms.amount == 0 {
        return Err(EscrowError::ZeroAmount);
    }
    if terms.receiver == payer {
        return Err(EscrowError::PayerCannotBeReceiver);
    }
    if let Some(referee) = terms.referee {
        if referee == payer {
            return Err(EscrowError::RefereeCannotBePayer);
        }
        if referee == terms.receiver {
            return Err(EscrowError::RefereeCannotBeReceiver);
        }
    }
    if let Some(expiration) = terms.expiration {
        if expiration.is_reached_at(ctx.now) {
            return Err(EscrowError::ExpirationMustBeInFuture {
                expiration,
                now: ctx.now,
            });
        }
    }

    let deposit = ctx.config.storage_deposit();
    FundTransferExecutor::new(ctx.balances).escrow(payer, id, terms.amount, deposit)?;

    let record = PaymentAgreement::new(id, payer, terms, ctx.now);
    // Cannot fail: the id was checked absent above and nothing ran in between.
    ctx.store.insert(record.clone())?;

    tracing::info!(
        %id,
        payer = %payer,
        receiver = %record.receiver,
        amount = record.amount,
        deposit,
        has_referee = record.referee.is_some(),
        expiration = ?record.expiration_timestamp.map(|t| t.as_secs()),
        "Agreement created"
    );

    Ok(Receipt::new(
        ReceiptType::AgreementCreated,
        payer,
        record,
        true,
        None,
        ctx.now,
    ))
}

// ---------------------------------------------------------------------------
// Approve / Cancel
// ---------------------------------------------------------------------------

/// Set the signer's approval flag; complete if both parties have approved.
///
/// # Errors
/// `AgreementNotFound`, `Unauthorized`, `AgreementAlreadyCompleted`,
/// `AgreementAlreadyCancelled`.
pub fn approve(ctx: &mut Context<'_>, target: &AgreementRef) -> Result<Receipt> {
    let (mut record, party) = load_party_record(ctx, InstructionKind::Approve, target)?;
    let changed = record.record_approval(party);

    if record.both_approved() {
        return finalize(ctx, record, Outcome::Completed);
    }
    flag_write(ctx, record, ReceiptType::ApprovalRecorded, changed)
}

/// Set the signer's cancel-request flag; cancel if both parties asked.
///
/// # Errors
/// `AgreementNotFound`, `Unauthorized`, `AgreementAlreadyCompleted`,
/// `AgreementAlreadyCancelled`.
pub fn cancel(ctx: &mut Context<'_>, target: &AgreementRef) -> Result<Receipt> {
    let (mut record, party) = load_party_record(ctx, InstructionKind::Cancel, target)?;
    let changed = record.record_cancel_request(party);

    if record.both_requested_cancel() {
        return finalize(ctx, record, Outcome::Cancelled);
    }
    flag_write(ctx, record, ReceiptType::CancelRequested, changed)
}

fn load_party_record(
    ctx: &Context<'_>,
    kind: InstructionKind,
    target: &AgreementRef,
) -> Result<(PaymentAgreement, Party)> {
    let id = target.id(&ctx.config.program_id);
    let record = ctx.store.load(&id)?;
    let role = guard::authorize(kind, ctx.signer, &record)?;
    record.ensure_pending()?;
    let party = role
        .as_party()
        .ok_or_else(|| EscrowError::Internal(format!("{kind} authorized for {role}")))?;
    Ok((record, party))
}

fn flag_write(
    ctx: &mut Context<'_>,
    record: PaymentAgreement,
    receipt_type: ReceiptType,
    changed: bool,
) -> Result<Receipt> {
    if changed {
        ctx.store.replace(record.clone())?;
        tracing::debug!(agreement = %record.id, signer = %ctx.signer, %receipt_type, "Flag set");
    } else {
        tracing::debug!(
            agreement = %record.id,
            signer = %ctx.signer,
            %receipt_type,
            "Flag already set"
        );
    }
    Ok(Receipt::new(
        receipt_type,
        ctx.signer,
        record,
        changed,
        None,
        ctx.now,
    ))
}

// ---------------------------------------------------------------------------
// Referee intervention
// ---------------------------------------------------------------------------

/// Referee pays the receiver regardless of flags.
///
/// # Errors
/// `AgreementNotFound`, `Unauthorized`, `AgreementAlreadyCompleted`,
/// `AgreementAlreadyCancelled`.
pub fn referee_complete(ctx: &mut Context<'_>, target: &AgreementRef) -> Result<Receipt> {
    let record = load_referee_record(ctx, InstructionKind::RefereeComplete, target)?;
    finalize(ctx, record, Outcome::RefereeCompleted)
}

/// Referee refunds the payer regardless of flags.
///
/// # Errors
/// `AgreementNotFound`, `Unauthorized`, `AgreementAlreadyCompleted`,
/// `AgreementAlreadyCancelled`.
pub fn referee_cancel(ctx: &mut Context<'_>, target: &AgreementRef) -> Result<Receipt> {
    let record = load_referee_record(ctx, InstructionKind::RefereeCancel, target)?;
    finalize(ctx, record, Outcome::RefereeCancelled)
}

fn load_referee_record(
    ctx: &Context<'_>,
    kind: InstructionKind,
    target: &AgreementRef,
) -> Result<PaymentAgreement> {
    let id = target.id(&ctx.config.program_id);
    let record = ctx.store.load(&id)?;
    guard::authorize(kind, ctx.signer, &record)?;
    record.ensure_pending()?;
    Ok(record)
}

// ---------------------------------------------------------------------------
// WithdrawExpired
// ---------------------------------------------------------------------------

/// Payer reclaims an agreement whose expiration has been reached.
///
/// # Errors
/// `Unauthorized` if the signer is not the payer; otherwise
/// `PaymentAgreementNotExpired` for a missing record, an agreement without
/// expiration, one not yet expired, or one no longer pending.
pub fn withdraw_expired(ctx: &mut Context<'_>, target: &AgreementRef) -> Result<Receipt> {
    let id = target.id(&ctx.config.program_id);
    let record = ctx
        .store
        .load(&id)
        .map_err(|_| EscrowError::PaymentAgreementNotExpired)?;
    guard::authorize(InstructionKind::WithdrawExpired, ctx.signer, &record)?;

    if !record.is_expired_at(ctx.now) || !record.is_pending() {
        tracing::debug!(
            %id,
            now = ctx.now.as_secs(),
            expiration = ?record.expiration_timestamp.map(|t| t.as_secs()),
            "Withdrawal before expiry rejected"
        );
        return Err(EscrowError::PaymentAgreementNotExpired);
    }
    finalize(ctx, record, Outcome::Expired)
}

// ---------------------------------------------------------------------------
// Terminal transitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Cancelled,
    RefereeCompleted,
    RefereeCancelled,
    Expired,
}

impl Outcome {
    fn pays_receiver(self) -> bool {
        matches!(self, Self::Completed | Self::RefereeCompleted)
    }

    fn by_referee(self) -> bool {
        matches!(self, Self::RefereeCompleted | Self::RefereeCancelled)
    }

    fn receipt_type(self) -> ReceiptType {
        match self {
            Self::Completed | Self::RefereeCompleted => ReceiptType::AgreementCompleted,
            Self::Cancelled | Self::RefereeCancelled => ReceiptType::AgreementCancelled,
            Self::Expired => ReceiptType::ExpiredWithdrawn,
        }
    }
}

/// Disburse custody, flag the record terminal, delete it.
///
/// The deposit always returns to the payer, who funded it.
fn finalize(
    ctx: &mut Context<'_>,
    mut record: PaymentAgreement,
    outcome: Outcome,
) -> Result<Receipt> {
    let recipient = if outcome.pays_receiver() {
        record.receiver
    } else {
        record.payer
    };
    let disbursement = FundTransferExecutor::new(ctx.balances).disburse(
        record.id,
        recipient,
        record.amount,
        record.payer,
    )?;

    if outcome.pays_receiver() {
        record.mark_completed(outcome.by_referee());
    } else {
        record.mark_cancelled(outcome.by_referee());
    }
    ctx.store.delete(&record.id);

    let receipt_type = outcome.receipt_type();
    tracing::info!(
        agreement = %record.id,
        signer = %ctx.signer,
        recipient = %recipient,
        amount = disbursement.amount,
        deposit_refunded = disbursement.deposit_refunded,
        referee = record.is_referee_intervened,
        %receipt_type,
        "Agreement closed"
    );

    Ok(Receipt::new(
        receipt_type,
        ctx.signer,
        record,
        true,
        Some(disbursement),
        ctx.now,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYER: Address = Address([1; 32]);
    const RECEIVER: Address = Address([2; 32]);
    const REFEREE: Address = Address([3; 32]);

    struct World {
        config: ProgramConfig,
        store: AgreementStore,
        balances: BalanceManager,
    }

    impl World {
        fn new() -> Self {
            let config = ProgramConfig {
                deposit_per_byte: 1,
                ..ProgramConfig::default()
            };
            let mut balances = BalanceManager::new();
            balances.fund(PAYER, 1_000_000).unwrap();
            Self {
                config,
                store: AgreementStore::new(),
                balances,
            }
        }

        fn ctx(&mut self, signer: Address, now: u64) -> Context<'_> {
            Context {
                config: &self.config,
                store: &mut self.store,
                balances: &mut self.balances,
                signer,
                now: Timestamp::new(now),
            }
        }
    }

    fn terms(name: &str, amount: u64) -> AgreementTerms {
        AgreementTerms {
            name: name.into(),
            receiver: RECEIVER,
            amount,
            referee: Some(REFEREE),
            expiration: Some(Timestamp::new(200)),
        }
    }

    fn target() -> AgreementRef {
        AgreementRef::new(PAYER, "p1")
    }

    #[test]
    fn create_escrows_amount_and_deposit() {
        let mut w = World::new();
        let receipt = create_agreement(&mut w.ctx(PAYER, 100), terms("p1", 5_000)).unwrap();
        let deposit = w.config.storage_deposit();

        assert_eq!(receipt.receipt_type, ReceiptType::AgreementCreated);
        assert_eq!(w.balances.balance(&PAYER), 1_000_000 - 5_000 - deposit);
        assert_eq!(w.balances.custody(&receipt.agreement_id), 5_000 + deposit);
        assert!(w.store.get(&receipt.agreement_id).unwrap().is_pending());
        w.balances.verify_supply().unwrap();
    }

    #[test]
    fn create_validation_order() {
        let mut w = World::new();
        create_agreement(&mut w.ctx(PAYER, 100), terms("taken", 1)).unwrap();
        let escrowed = 1_000_000 - w.balances.balance(&PAYER);

        let mut t = terms("taken", 0);
        t.receiver = PAYER;
        assert!(matches!(
            create_agreement(&mut w.ctx(PAYER, 100), t.clone()),
            Err(EscrowError::AgreementAlreadyExists(_))
        ));
        t.name = String::new();
        assert!(matches!(
            create_agreement(&mut w.ctx(PAYER, 100), t.clone()),
            Err(EscrowError::InvalidName { len: 0, max: 32 })
        ));
        t.name = "p1".into();
        assert!(matches!(
            create_agreement(&mut w.ctx(PAYER, 100), t.clone()),
            Err(EscrowError::ZeroAmount)
        ));
        t.amount = 1;
        t.referee = Some(PAYER);
        t.expiration = Some(Timestamp::new(1));
        assert!(matches!(
            create_agreement(&mut w.ctx(PAYER, 100), t),
            Err(EscrowError::PayerCannotBeReceiver)
        ));
        assert_eq!(w.store.len(), 1);
        assert_eq!(w.balances.balance(&PAYER), 1_000_000 - escrowed);
    }

    #[test]
    fn expiration_equal_to_now_rejected() {
        let mut w = World::new();
        let err = create_agreement(&mut w.ctx(PAYER, 200), terms("p1", 1)).unwrap_err();
        assert!(matches!(err, EscrowError::ExpirationMustBeInFuture { .. }));
        create_agreement(&mut w.ctx(PAYER, 199), terms("p1", 1)).unwrap();
    }

    #[test]
    fn duplicate_checked_before_every_other_rule() {
        let mut w = World::new();
        create_agreement(&mut w.ctx(PAYER, 100), terms("p1", 1)).unwrap();

        let mut t = terms("p1", 0);
        let err = create_agreement(&mut w.ctx(PAYER, 100), t.clone()).unwrap_err();
        assert!(matches!(err, EscrowError::AgreementAlreadyExists(_)));

        t.amount = 1;
        t.receiver = PAYER;
        let err = create_agreement(&mut w.ctx(PAYER, 100), t).unwrap_err();
        assert!(matches!(err, EscrowError::AgreementAlreadyExists(_)));
        assert_eq!(w.store.len(), 1);
    }

    #[test]
    fn insufficient_funds_is_last() {
        let mut w = World::new();
        let err = create_agreement(&mut w.ctx(PAYER, 100), terms("p1", 1_000_000)).unwrap_err();
        assert!(matches!(err, EscrowError::InsufficientFunds { .. }));
        assert!(w.store.is_empty());
    }

    #[test]
    fn second_approval_completes() {
        let mut w = World::new();
        create_agreement(&mut w.ctx(PAYER, 100), terms("p1", 5_000)).unwrap();

        let first = approve(&mut w.ctx(RECEIVER, 101), &target()).unwrap();
        assert_eq!(first.receipt_type, ReceiptType::ApprovalRecorded);
        assert!(first.snapshot.receiver_approved);

        let again = approve(&mut w.ctx(RECEIVER, 101), &target()).unwrap();
        assert!(!again.state_changed);

        let done = approve(&mut w.ctx(PAYER, 102), &target()).unwrap();
        assert_eq!(done.receipt_type, ReceiptType::AgreementCompleted);
        assert!(done.snapshot.is_completed);
        assert!(!done.snapshot.is_referee_intervened);
        assert_eq!(done.disbursement.unwrap().recipient, RECEIVER);
        assert_eq!(w.balances.balance(&RECEIVER), 5_000);
        assert!(w.store.is_empty());
        w.balances.verify_supply().unwrap();
    }

    #[test]
    fn referee_cannot_approve() {
        let mut w = World::new();
        create_agreement(&mut w.ctx(PAYER, 100), terms("p1", 5_000)).unwrap();
        let err = approve(&mut w.ctx(REFEREE, 101), &target()).unwrap_err();
        assert!(matches!(err, EscrowError::Unauthorized { .. }));
    }

    #[test]
    fn referee_cancel_refunds_everything() {
        let mut w = World::new();
        create_agreement(&mut w.ctx(PAYER, 100), terms("p1", 5_000)).unwrap();
        approve(&mut w.ctx(PAYER, 101), &target()).unwrap();

        let r = referee_cancel(&mut w.ctx(REFEREE, 102), &target()).unwrap();
        assert!(r.snapshot.is_cancelled && r.snapshot.is_referee_intervened);
        assert!(r.snapshot.payer_approved);
        assert_eq!(w.balances.balance(&PAYER), 1_000_000);
        assert_eq!(w.balances.custody_count(), 0);
    }

    #[test]
    fn withdraw_expired_paths() {
        let mut w = World::new();
        create_agreement(&mut w.ctx(PAYER, 100), terms("p1", 5_000)).unwrap();

        let early = withdraw_expired(&mut w.ctx(PAYER, 199), &target()).unwrap_err();
        assert!(matches!(early, EscrowError::PaymentAgreementNotExpired));
        let stranger = withdraw_expired(&mut w.ctx(RECEIVER, 300), &target()).unwrap_err();
        assert!(matches!(stranger, EscrowError::Unauthorized { .. }));

        let r = withdraw_expired(&mut w.ctx(PAYER, 200), &target()).unwrap();
        assert_eq!(r.receipt_type, ReceiptType::ExpiredWithdrawn);
        assert_eq!(w.balances.balance(&PAYER), 1_000_000);

        let gone = withdraw_expired(&mut w.ctx(PAYER, 300), &target()).unwrap_err();
        assert!(matches!(gone, EscrowError::PaymentAgreementNotExpired));
    }
}
