//! Receipt types for the EscrowPay audit journal.
//!
//! Every successful instruction produces a [`Receipt`]. Agreements are
//! deleted on their terminal transition, so the terminal receipt's
//! `snapshot` is the only place the final flags remain visible.

use serde::{Deserialize, Serialize};

use crate::{Address, AgreementId, PaymentAgreement, ReceiptId, Timestamp};

/// The type of action this receipt proves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiptType {
    /// Payer funded custody and the record was created.
    AgreementCreated,
    /// An approval flag was written (or was already set).
    ApprovalRecorded,
    /// A cancel-request flag was written (or was already set).
    CancelRequested,
    /// `amount` moved to the receiver; record deleted.
    AgreementCompleted,
    /// `amount` refunded to the payer; record deleted.
    AgreementCancelled,
    /// Payer reclaimed an expired agreement; record deleted.
    ExpiredWithdrawn,
}

impl ReceiptType {
    /// Whether this receipt records a record-deleting transition.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::AgreementCompleted | Self::AgreementCancelled | Self::ExpiredWithdrawn
        )
    }
}

impl std::fmt::Display for ReceiptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AgreementCreated => write!(f, "AGREEMENT_CREATED"),
            Self::ApprovalRecorded => write!(f, "APPROVAL_RECORDED"),
            Self::CancelRequested => write!(f, "CANCEL_REQUESTED"),
            Self::AgreementCompleted => write!(f, "AGREEMENT_COMPLETED"),
            Self::AgreementCancelled => write!(f, "AGREEMENT_CANCELLED"),
            Self::ExpiredWithdrawn => write!(f, "EXPIRED_WITHDRAWN"),
        }
    }
}

/// Funds moved out of custody by a terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disbursement {
    /// Who received the escrowed `amount`.
    pub recipient: Address,
    pub amount: u64,
    /// Storage deposit returned with the closed record.
    pub deposit_refunded: u64,
}

/// Proof that an instruction executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptId,
    pub receipt_type: ReceiptType,
    pub agreement_id: AgreementId,
    /// The verified signer of the instruction.
    pub actor: Address,
    /// `false` when the instruction re-set an already-set flag.
    pub state_changed: bool,
    /// Present only on terminal receipts.
    pub disbursement: Option<Disbursement>,
    /// The record as of the end of the instruction.
    pub snapshot: PaymentAgreement,
    /// SHA-256 of `snapshot` (see [`PaymentAgreement::snapshot_hash`]).
    pub snapshot_hash: [u8; 32],
    pub issued_at: Timestamp,
}

impl Receipt {
    #[must_use]
    pub fn new(
        receipt_type: ReceiptType,
        actor: Address,
        snapshot: PaymentAgreement,
        state_changed: bool,
        disbursement: Option<Disbursement>,
        issued_at: Timestamp,
    ) -> Self {
        Self {
            id: ReceiptId::new(),
            receipt_type,
            agreement_id: snapshot.id,
            actor,
            state_changed,
            disbursement,
            snapshot_hash: snapshot.snapshot_hash(),
            snapshot,
            issued_at,
        }
    }

    /// Recompute the snapshot hash and compare.
    #[must_use]
    pub fn verify_snapshot(&self) -> bool {
        self.snapshot.snapshot_hash() == self.snapshot_hash
    }
}
