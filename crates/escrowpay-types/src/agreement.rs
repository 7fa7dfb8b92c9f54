//! # PaymentAgreement: the escrow record
//!
//! One record per (payer, name) pair, addressed by its derived
//! [`AgreementId`]. The record holds the immutable terms plus two
//! independent pairs of flags:
//!
//! ```text
//!                 both approvals          ┌───────────┐
//!            ┌───────────────────────────▶│ COMPLETED │
//!   ┌────────┴┐   referee complete        └───────────┘
//!   │ PENDING │
//!   └────────┬┘   both cancel requests    ┌───────────┐
//!            └───────────────────────────▶│ CANCELLED │
//!                 referee cancel / expiry └───────────┘
//! ```
//!
//! Terminal states are never stored: the transition that sets
//! `is_completed` or `is_cancelled` deletes the record in the same step.
//! The flagged copy survives only as the snapshot inside a receipt.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    Address, AgreementId, AgreementTerms, EscrowError, Result, Timestamp, constants,
};

/// Lifecycle state of an agreement, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgreementStatus {
    Pending,
    Completed,
    Cancelled,
}

impl fmt::Display for AgreementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// The role an address plays in a specific agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Payer,
    Receiver,
    Referee,
}

impl Role {
    /// The bilateral party for this role; the referee is not one.
    #[must_use]
    pub fn as_party(self) -> Option<Party> {
        match self {
            Self::Payer => Some(Party::Payer),
            Self::Receiver => Some(Party::Receiver),
            Self::Referee => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payer => write!(f, "PAYER"),
            Self::Receiver => write!(f, "RECEIVER"),
            Self::Referee => write!(f, "REFEREE"),
        }
    }
}

/// One side of the bilateral agreement. Owns one approval flag and one
/// cancel-request flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Party {
    Payer,
    Receiver,
}

/// An escrow agreement between a payer and a receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAgreement {
    /// Derived from (payer, name).
    pub id: AgreementId,
    pub name: String,
    pub payer: Address,
    pub receiver: Address,
    pub referee: Option<Address>,
    /// Native units held in custody. Fixed at creation.
    pub amount: u64,
    pub expiration_timestamp: Option<Timestamp>,
    pub payer_approved: bool,
    pub receiver_approved: bool,
    pub payer_requested_cancel: bool,
    pub receiver_requested_cancel: bool,
    pub is_completed: bool,
    pub is_cancelled: bool,
    pub is_referee_intervened: bool,
    pub created_at: Timestamp,
}

impl PaymentAgreement {
    /// A fresh pending agreement with every flag cleared.
    #[must_use]
    pub fn new(
        id: AgreementId,
        payer: Address,
        terms: AgreementTerms,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            name: terms.name,
            payer,
            receiver: terms.receiver,
            referee: terms.referee,
            amount: terms.amount,
            expiration_timestamp: terms.expiration,
            payer_approved: false,
            receiver_approved: false,
            payer_requested_cancel: false,
            receiver_requested_cancel: false,
            is_completed: false,
            is_cancelled: false,
            is_referee_intervened: false,
            created_at,
        }
    }

    #[must_use]
    pub fn status(&self) -> AgreementStatus {
        if self.is_completed {
            AgreementStatus::Completed
        } else if self.is_cancelled {
            AgreementStatus::Cancelled
        } else {
            AgreementStatus::Pending
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status() == AgreementStatus::Pending
    }

    /// # Errors
    /// `AgreementAlreadyCompleted` or `AgreementAlreadyCancelled` for a
    /// terminal record.
    pub fn ensure_pending(&self) -> Result<()> {
        match self.status() {
            AgreementStatus::Pending => Ok(()),
            AgreementStatus::Completed => Err(EscrowError::AgreementAlreadyCompleted),
            AgreementStatus::Cancelled => Err(EscrowError::AgreementAlreadyCancelled),
        }
    }

    /// The role `address` holds in this agreement, if any.
    #[must_use]
    pub fn role_of(&self, address: &Address) -> Option<Role> {
        if *address == self.payer {
            Some(Role::Payer)
        } else if *address == self.receiver {
            Some(Role::Receiver)
        } else if self.referee.as_ref() == Some(address) {
            Some(Role::Referee)
        } else {
            None
        }
    }

    /// Set `party`'s approval flag. Returns `false` if it was already set.
    pub fn record_approval(&mut self, party: Party) -> bool {
        let flag = match party {
            Party::Payer => &mut self.payer_approved,
            Party::Receiver => &mut self.receiver_approved,
        };
        !std::mem::replace(flag, true)
    }

    /// Set `party`'s cancel-request flag. Returns `false` if it was already set.
    pub fn record_cancel_request(&mut self, party: Party) -> bool {
        let flag = match party {
            Party::Payer => &mut self.payer_requested_cancel,
            Party::Receiver => &mut self.receiver_requested_cancel,
        };
        !std::mem::replace(flag, true)
    }

    #[must_use]
    pub fn both_approved(&self) -> bool {
        self.payer_approved && self.receiver_approved
    }

    #[must_use]
    pub fn both_requested_cancel(&self) -> bool {
        self.payer_requested_cancel && self.receiver_requested_cancel
    }

    pub fn mark_completed(&mut self, by_referee: bool) {
        self.is_completed = true;
        self.is_referee_intervened |= by_referee;
    }

    pub fn mark_cancelled(&mut self, by_referee: bool) {
        self.is_cancelled = true;
        self.is_referee_intervened |= by_referee;
    }

    /// True iff an expiration is set and `now` has reached it.
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expiration_timestamp
            .is_some_and(|expiration| expiration.is_reached_at(now))
    }

    /// Canonical persisted layout, field order fixed:
    /// `discriminator(8) || name(u32 LE len + bytes) || payer(32) || receiver(32)
    ///  || referee(1 + 32?) || amount(8) || expiration(1 + 8?) || flags(7) || created_at(8)`.
    ///
    /// Never longer than [`constants::AGREEMENT_SPACE`] for a valid name.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(constants::AGREEMENT_SPACE);
        out.extend_from_slice(&discriminator());
        out.extend_from_slice(&u32::try_from(self.name.len()).unwrap_or(u32::MAX).to_le_bytes());
        out.extend_from_slice(self.name.as_bytes());
        out.extend_from_slice(self.payer.as_bytes());
        out.extend_from_slice(self.receiver.as_bytes());
        match &self.referee {
            Some(referee) => {
                out.push(1);
                out.extend_from_slice(referee.as_bytes());
            }
            None => out.push(0),
        }
        out.extend_from_slice(&self.amount.to_le_bytes());
        match self.expiration_timestamp {
            Some(expiration) => {
                out.push(1);
                out.extend_from_slice(&expiration.as_secs().to_le_bytes());
            }
            None => out.push(0),
        }
        for flag in [
            self.payer_approved,
            self.receiver_approved,
            self.payer_requested_cancel,
            self.receiver_requested_cancel,
            self.is_completed,
            self.is_cancelled,
            self.is_referee_intervened,
        ] {
            out.push(u8::from(flag));
        }
        out.extend_from_slice(&self.created_at.as_secs().to_le_bytes());
        out
    }

    /// SHA-256 over the domain tag, id, and [`encode`](Self::encode).
    #[must_use]
    pub fn snapshot_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(constants::SNAPSHOT_DOMAIN);
        hasher.update(self.id.as_bytes());
        hasher.update(self.encode());
        hasher.finalize().into()
    }
}

/// First 8 bytes of `sha256("account:PaymentAgreement")`.
fn discriminator() -> [u8; constants::DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(b"account:PaymentAgreement");
    let mut out = [0u8; constants::DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..constants::DISCRIMINATOR_LEN]);
    out
}

/// Dummy agreement for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl PaymentAgreement {
    pub fn dummy(payer: Address, receiver: Address, amount: u64) -> Self {
        let name = "dummy".to_string();
        let id = AgreementId::derive(&crate::ProgramId::default(), &payer, &name);
        Self::new(
            id,
            payer,
            AgreementTerms {
                name,
                receiver,
                amount,
                referee: None,
                expiration: None,
            },
            Timestamp::new(1_700_000_000),
        )
    }
}
