//! Configuration for an EscrowPay program instance.

use serde::{Deserialize, Serialize};

use crate::{EscrowError, ProgramId, Result, constants};

/// Configuration for a single program deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramConfig {
    /// Identity mixed into every agreement id.
    pub program_id: ProgramId,
    /// Maximum agreement name length in bytes.
    pub max_name_len: usize,
    /// Storage deposit rate, native units per byte of record.
    pub deposit_per_byte: u64,
    /// (signer, nonce) pairs remembered for replay rejection.
    pub replay_cache_size: usize,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            program_id: ProgramId::default(),
            max_name_len: constants::MAX_NAME_LEN,
            deposit_per_byte: constants::DEFAULT_DEPOSIT_PER_BYTE,
            replay_cache_size: constants::DEFAULT_REPLAY_CACHE_SIZE,
        }
    }
}

impl ProgramConfig {
    /// Parse and validate a JSON config. Missing fields take defaults.
    ///
    /// # Errors
    /// `Serialization` for malformed JSON, `Configuration` for bad values.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns `Configuration` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.max_name_len == 0 || self.max_name_len > constants::MAX_NAME_LEN {
            return Err(EscrowError::Configuration(format!(
                "max_name_len must be in 1..={}, got {}",
                constants::MAX_NAME_LEN,
                self.max_name_len
            )));
        }
        if self.replay_cache_size == 0 {
            return Err(EscrowError::Configuration(
                "replay_cache_size must be > 0".into(),
            ));
        }
        if self.checked_storage_deposit().is_none() {
            return Err(EscrowError::Configuration(format!(
                "deposit_per_byte {} overflows the storage deposit",
                self.deposit_per_byte
            )));
        }
        Ok(())
    }

    /// Deposit held with every record: `(AGREEMENT_SPACE + ACCOUNT_OVERHEAD) * deposit_per_byte`.
    /// Saturates; [`validate`](Self::validate) rejects rates where it would.
    #[must_use]
    pub fn storage_deposit(&self) -> u64 {
        self.checked_storage_deposit().unwrap_or(u64::MAX)
    }

    fn checked_storage_deposit(&self) -> Option<u64> {
        let bytes = u64::try_from(constants::AGREEMENT_SPACE + constants::ACCOUNT_OVERHEAD).ok()?;
        bytes.checked_mul(self.deposit_per_byte)
    }
}
