//! Native-unit balance management.
//!
//! Tracks one balance per wallet [`Address`] and one custody balance per
//! live agreement. Custody is only ever touched through the
//! [`FundTransferExecutor`](crate::FundTransferExecutor); this module
//! handles value entering and leaving the ledger.

use std::collections::HashMap;

use escrowpay_types::{Address, AgreementId, EscrowError, Result};

use crate::supply_conservation::SupplyConservation;

/// Manages wallet and custody balances.
#[derive(Debug, Default)]
pub struct BalanceManager {
    wallets: HashMap<Address, u64>,
    custody: HashMap<AgreementId, u64>,
    supply: SupplyConservation,
}

impl BalanceManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit value from outside the ledger.
    ///
    /// # Errors
    /// Returns `BalanceOverflow` if the wallet would exceed `u64::MAX`.
    pub fn fund(&mut self, address: Address, amount: u64) -> Result<()> {
        let current = self.balance(&address);
        let next = current
            .checked_add(amount)
            .ok_or(EscrowError::BalanceOverflow)?;
        self.wallets.insert(address, next);
        self.supply.record_funding(amount);
        Ok(())
    }

    /// Debit value out of the ledger.
    ///
    /// # Errors
    /// Returns `InsufficientFunds` if the wallet holds less than `amount`.
    pub fn withdraw(&mut self, address: Address, amount: u64) -> Result<()> {
        let available = self.balance(&address);
        if available < amount {
            return Err(EscrowError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        self.set_wallet(address, available - amount);
        self.supply.record_withdrawal(amount);
        Ok(())
    }

    #[must_use]
    pub fn balance(&self, address: &Address) -> u64 {
        self.wallets.get(address).copied().unwrap_or(0)
    }

    /// Value held for an agreement, zero once its custody is closed.
    #[must_use]
    pub fn custody(&self, id: &AgreementId) -> u64 {
        self.custody.get(id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn has_custody(&self, id: &AgreementId) -> bool {
        self.custody.contains_key(id)
    }

    /// Number of open custody accounts.
    #[must_use]
    pub fn custody_count(&self) -> usize {
        self.custody.len()
    }

    /// Σ wallets + Σ custody.
    #[must_use]
    pub fn total_supply(&self) -> u128 {
        let wallets: u128 = self.wallets.values().map(|v| u128::from(*v)).sum();
        let custody: u128 = self.custody.values().map(|v| u128::from(*v)).sum();
        wallets + custody
    }

    /// # Errors
    /// Returns `SupplyInvariantViolation` if value was created or destroyed.
    pub fn verify_supply(&self) -> Result<()> {
        self.supply.verify(self.total_supply())
    }

    #[must_use]
    pub fn supply(&self) -> &SupplyConservation {
        &self.supply
    }

    pub(crate) fn set_wallet(&mut self, address: Address, value: u64) {
        if value == 0 {
            self.wallets.remove(&address);
        } else {
            self.wallets.insert(address, value);
        }
    }

    pub(crate) fn open_custody(&mut self, id: AgreementId, value: u64) {
        self.custody.insert(id, value);
    }

    pub(crate) fn close_custody(&mut self, id: &AgreementId) {
        self.custody.remove(id);
    }
}
