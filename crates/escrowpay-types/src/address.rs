//! Account addresses and the program identity.
//!
//! An [`Address`] is the raw ed25519 public key (32 bytes) of a wallet,
//! the same way a `NodeId` identifies a peer. [`ProgramId`] names the
//! escrow program itself and is mixed into every derived agreement id.

use std::fmt;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{EscrowError, Result, constants};

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A wallet address: the raw ed25519 public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string.
    ///
    /// # Errors
    /// Returns `Serialization` if the string is not 32 bytes of hex.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| EscrowError::Serialization(e.to_string()))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            EscrowError::Serialization(format!("address must be 32 bytes, got {}", b.len()))
        })?;
        Ok(Self(arr))
    }

    /// Interpret this address as an ed25519 verifying key.
    ///
    /// # Errors
    /// Returns `InvalidSignature` if the bytes are not a valid curve point.
    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        VerifyingKey::from_bytes(&self.0).map_err(|e| EscrowError::InvalidSignature {
            reason: format!("signer {self} is not a valid ed25519 key: {e}"),
        })
    }
}

impl From<&VerifyingKey> for Address {
    fn from(key: &VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// Random addresses for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    pub fn random() -> Self {
        Self(rand::random::<[u8; 32]>())
    }
}

// ---------------------------------------------------------------------------
// ProgramId
// ---------------------------------------------------------------------------

/// Identity of the escrow program. Part of every agreement id derivation,
/// so two deployments never share an id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramId(pub [u8; 32]);

impl ProgramId {
    /// Derive a program id from a human-readable deployment label.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"escrowpay:program_id:");
        hasher.update(label.as_bytes());
        Self(hasher.finalize().into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Default for ProgramId {
    fn default() -> Self {
        Self::from_label(constants::DEFAULT_PROGRAM_LABEL)
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program:{}", hex::encode(&self.0[..8]))
    }
}
