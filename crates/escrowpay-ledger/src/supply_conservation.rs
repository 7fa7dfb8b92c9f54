//! Supply conservation invariant checker.
//!
//! Mathematical invariant, checked on demand through `verify_supply`:
//! ```text
//! Σ(wallets) + Σ(custody) == Σ(funded) - Σ(withdrawn)
//! ```
//!
//! Escrow and disbursement only move value between wallets and custody.
//! If the sum ever drifts, value was created or destroyed and the ledger
//! must be treated as corrupt.

use escrowpay_types::{EscrowError, Result};

/// Tracks native-unit inflows and outflows and validates conservation.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    /// Total funded into wallets since genesis.
    funded: u128,
    /// Total withdrawn out of wallets since genesis.
    withdrawn: u128,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record value entering the ledger.
    pub fn record_funding(&mut self, amount: u64) {
        self.funded += u128::from(amount);
    }

    /// Record value leaving the ledger.
    pub fn record_withdrawal(&mut self, amount: u64) {
        self.withdrawn += u128::from(amount);
    }

    /// Expected total supply: funded - withdrawn.
    #[must_use]
    pub fn expected_supply(&self) -> u128 {
        self.funded.saturating_sub(self.withdrawn)
    }

    /// Verify that the actual supply matches the expected supply.
    ///
    /// # Errors
    /// Returns [`EscrowError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, actual_supply: u128) -> Result<()> {
        let expected = self.expected_supply();
        if actual_supply != expected {
            return Err(EscrowError::SupplyInvariantViolation {
                reason: format!(
                    "actual supply {actual_supply} != expected {expected} \
                     (funded={}, withdrawn={})",
                    self.funded, self.withdrawn
                ),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn total_funded(&self) -> u128 {
        self.funded
    }

    #[must_use]
    pub fn total_withdrawn(&self) -> u128 {
        self.withdrawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_supply_is_zero() {
        let sc = SupplyConservation::new();
        assert_eq!(sc.expected_supply(), 0);
        assert!(sc.verify(0).is_ok());
    }

    #[test]
    fn funding_and_withdrawal() {
        let mut sc = SupplyConservation::new();
        sc.record_funding(1_000);
        sc.record_funding(500);
        sc.record_withdrawal(300);
        assert_eq!(sc.expected_supply(), 1_200);
        assert_eq!(sc.total_funded(), 1_500);
        assert_eq!(sc.total_withdrawn(), 300);
    }

    #[test]
    fn verify_fails_when_imbalanced() {
        let mut sc = SupplyConservation::new();
        sc.record_funding(10);
        let err = sc.verify(11).unwrap_err();
        assert!(matches!(err, EscrowError::SupplyInvariantViolation { .. }));
    }

    #[test]
    fn no_overflow_past_u64() {
        let mut sc = SupplyConservation::new();
        sc.record_funding(u64::MAX);
        sc.record_funding(u64::MAX);
        assert_eq!(sc.expected_supply(), 2 * u128::from(u64::MAX));
    }
}
