//! Fund transfer executor: atomic custody movement.
//!
//! Two operations, each all-or-nothing:
//! 1. **escrow**: payer wallet → new custody account (`amount + deposit`)
//! 2. **disburse**: custody → `amount` to a recipient, the remaining
//!    deposit back to the depositor, custody account closed
//!
//! Every post-balance is computed with checked arithmetic before the
//! first write, so a failed transfer leaves the ledger untouched.

use escrowpay_types::{Address, AgreementId, Disbursement, EscrowError, Result};

use crate::balance_manager::BalanceManager;

/// Moves value between wallets and agreement custody.
pub struct FundTransferExecutor<'a> {
    balances: &'a mut BalanceManager,
}

impl<'a> FundTransferExecutor<'a> {
    pub fn new(balances: &'a mut BalanceManager) -> Self {
        Self { balances }
    }

    /// Lock `amount + deposit` from `payer` into a fresh custody account.
    ///
    /// # Errors
    /// - `InsufficientFunds` if the payer cannot cover both, including when
    ///   `amount + deposit` exceeds `u64::MAX` (reported as `needed: u64::MAX`)
    /// - `Internal` if custody for `id` is already open
    pub fn escrow(
        &mut self,
        payer: Address,
        id: AgreementId,
        amount: u64,
        deposit: u64,
    ) -> Result<()> {
        let available = self.balances.balance(&payer);
        let needed = amount.saturating_add(deposit);
        if u128::from(available) < u128::from(amount) + u128::from(deposit) {
            return Err(EscrowError::InsufficientFunds { needed, available });
        }
        if self.balances.has_custody(&id) {
            return Err(EscrowError::Internal(format!("custody already open for {id}")));
        }

        self.balances.set_wallet(payer, available - needed);
        self.balances.open_custody(id, needed);

        tracing::debug!(%id, payer = %payer, amount, deposit, "Custody opened");
        Ok(())
    }

    /// Pay `amount` out of custody to `recipient`, return whatever remains
    /// (the storage deposit) to `depositor`, and close the custody account.
    ///
    /// # Errors
    /// - `CustodyShortfall` if custody holds less than `amount`
    /// - `BalanceOverflow` if a credit would overflow
    pub fn disburse(
        &mut self,
        id: AgreementId,
        recipient: Address,
        amount: u64,
        depositor: Address,
    ) -> Result<Disbursement> {
        let held = self.balances.custody(&id);
        if !self.balances.has_custody(&id) || held < amount {
            return Err(EscrowError::CustodyShortfall {
                id,
                needed: amount,
                held,
            });
        }
        let deposit = held - amount;

        // Compute every post-balance before writing any of them.
        let writes: Vec<(Address, u64)> = if recipient == depositor {
            let next = self
                .balances
                .balance(&recipient)
                .checked_add(held)
                .ok_or(EscrowError::BalanceOverflow)?;
            vec![(recipient, next)]
        } else {
            let recipient_next = self
                .balances
                .balance(&recipient)
                .checked_add(amount)
                .ok_or(EscrowError::BalanceOverflow)?;
            let depositor_next = self
                .balances
                .balance(&depositor)
                .checked_add(deposit)
                .ok_or(EscrowError::BalanceOverflow)?;
            vec![(recipient, recipient_next), (depositor, depositor_next)]
        };

        for (address, value) in writes {
            self.balances.set_wallet(address, value);
        }
        self.balances.close_custody(&id);

        tracing::debug!(
            %id,
            recipient = %recipient,
            amount,
            deposit,
            "Custody disbursed and closed"
        );

        Ok(Disbursement {
            recipient,
            amount,
            deposit_refunded: deposit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> AgreementId {
        AgreementId([n; 32])
    }

    fn funded(addr: Address, amount: u64) -> BalanceManager {
        let mut bm = BalanceManager::new();
        bm.fund(addr, amount).unwrap();
        bm
    }

    #[test]
    fn escrow_moves_into_custody() {
        let payer = Address::random();
        let mut bm = funded(payer, 10_000);
        FundTransferExecutor::new(&mut bm)
            .escrow(payer, id(1), 5_000, 100)
            .unwrap();
        assert_eq!(bm.balance(&payer), 4_900);
        assert_eq!(bm.custody(&id(1)), 5_100);
        bm.verify_supply().unwrap();
    }

    #[test]
    fn escrow_insufficient_leaves_ledger_untouched() {
        let payer = Address::random();
        let mut bm = funded(payer, 5_050);
        let err = FundTransferExecutor::new(&mut bm)
            .escrow(payer, id(1), 5_000, 100)
            .unwrap_err();
        assert!(matches!(
            err,
            EscrowError::InsufficientFunds {
                needed: 5_100,
                available: 5_050
            }
        ));
        assert_eq!(bm.balance(&payer), 5_050);
        assert!(!bm.has_custody(&id(1)));
    }

    #[test]
    fn escrow_beyond_u64_is_insufficient_funds() {
        let payer = Address::random();
        let mut bm = funded(payer, u64::MAX);
        let err = FundTransferExecutor::new(&mut bm)
            .escrow(payer, id(1), u64::MAX, 1)
            .unwrap_err();
        assert!(matches!(
            err,
            EscrowError::InsufficientFunds {
                needed: u64::MAX,
                available: u64::MAX
            }
        ));
        assert_eq!(bm.balance(&payer), u64::MAX);
        assert!(!bm.has_custody(&id(1)));
        bm.verify_supply().unwrap();
    }

    #[test]
    fn escrow_twice_into_same_custody_fails() {
        let payer = Address::random();
        let mut bm = funded(payer, 10_000);
        let mut ex = FundTransferExecutor::new(&mut bm);
        ex.escrow(payer, id(1), 1_000, 0).unwrap();
        let err = ex.escrow(payer, id(1), 1_000, 0).unwrap_err();
        assert!(matches!(err, EscrowError::Internal(_)));
        assert_eq!(bm.balance(&payer), 9_000);
    }

    #[test]
    fn disburse_to_receiver_refunds_deposit_to_payer() {
        let payer = Address::random();
        let receiver = Address::random();
        let mut bm = funded(payer, 10_000);
        let mut ex = FundTransferExecutor::new(&mut bm);
        ex.escrow(payer, id(1), 5_000, 100).unwrap();
        let d = ex.disburse(id(1), receiver, 5_000, payer).unwrap();

        assert_eq!(d.recipient, receiver);
        assert_eq!(d.amount, 5_000);
        assert_eq!(d.deposit_refunded, 100);
        assert_eq!(bm.balance(&receiver), 5_000);
        assert_eq!(bm.balance(&payer), 5_000);
        assert!(!bm.has_custody(&id(1)));
        bm.verify_supply().unwrap();
    }

    #[test]
    fn disburse_refund_to_payer_returns_everything() {
        let payer = Address::random();
        let mut bm = funded(payer, 10_000);
        let mut ex = FundTransferExecutor::new(&mut bm);
        ex.escrow(payer, id(1), 5_000, 100).unwrap();
        ex.disburse(id(1), payer, 5_000, payer).unwrap();
        assert_eq!(bm.balance(&payer), 10_000);
        assert_eq!(bm.custody_count(), 0);
        bm.verify_supply().unwrap();
    }

    #[test]
    fn disburse_closed_custody_fails() {
        let payer = Address::random();
        let mut bm = funded(payer, 10_000);
        let mut ex = FundTransferExecutor::new(&mut bm);
        ex.escrow(payer, id(1), 5_000, 0).unwrap();
        ex.disburse(id(1), payer, 5_000, payer).unwrap();
        let err = ex.disburse(id(1), payer, 5_000, payer).unwrap_err();
        assert!(matches!(err, EscrowError::CustodyShortfall { held: 0, .. }));
    }

    #[test]
    fn disburse_overflow_leaves_custody_open() {
        let payer = Address::random();
        let receiver = Address::random();
        let mut bm = funded(payer, 10);
        bm.fund(receiver, u64::MAX).unwrap();
        let mut ex = FundTransferExecutor::new(&mut bm);
        ex.escrow(payer, id(1), 10, 0).unwrap();
        let err = ex.disburse(id(1), receiver, 10, payer).unwrap_err();
        assert!(matches!(err, EscrowError::BalanceOverflow));
        assert_eq!(bm.custody(&id(1)), 10);
        assert_eq!(bm.balance(&receiver), u64::MAX);
        bm.verify_supply().unwrap();
    }
}
