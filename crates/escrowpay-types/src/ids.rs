//! Identifiers used throughout EscrowPay.
//!
//! Agreement ids are **derived**, never generated: the same
//! (program, payer, name) triple always yields the same id, and the id
//! alone is enough to locate the record. Receipt ids use UUIDv7 for
//! time-ordered sorting.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{Address, ProgramId, constants};

// ---------------------------------------------------------------------------
// AgreementId
// ---------------------------------------------------------------------------

/// Deterministic address of a payment agreement record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AgreementId(pub [u8; 32]);

impl AgreementId {
    /// Derive the agreement id for `(payer, name)` under `program_id`.
    ///
    /// Hash input: `domain || program_id || seg(AGREEMENT_SEED) || seg(payer) || seg(name)`
    /// where `seg(x) = len(x) as u32 LE || x`. Length-prefixing every seed
    /// keeps `("ab", "c")` and `("a", "bc")` apart.
    #[must_use]
    pub fn derive(program_id: &ProgramId, payer: &Address, name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(constants::AGREEMENT_ID_DOMAIN);
        hasher.update(program_id.as_bytes());
        let seeds: [&[u8]; 3] = [constants::AGREEMENT_SEED, payer.as_bytes(), name.as_bytes()];
        for seed in seeds {
            hasher.update(seed_len(seed).to_le_bytes());
            hasher.update(seed);
        }
        Self(hasher.finalize().into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AgreementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agreement:{}", hex::encode(&self.0[..8]))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn seed_len(seed: &[u8]) -> u32 {
    // Seeds are a short tag, a 32-byte key, and a length-checked name.
    seed.len() as u32
}

// ---------------------------------------------------------------------------
// ReceiptId
// ---------------------------------------------------------------------------

/// Unique identifier for a journal receipt. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ReceiptId(pub Uuid);

impl ReceiptId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ReceiptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "receipt:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
