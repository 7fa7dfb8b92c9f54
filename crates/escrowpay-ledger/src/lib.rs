//! # escrowpay-ledger
//!
//! **Hosting-runtime model**: the state the escrow program runs against.
//!
//! ## Architecture
//!
//! 1. **BalanceManager**: native-unit wallet balances plus one custody
//!    account per live agreement
//! 2. **FundTransferExecutor**: all-or-nothing moves between wallets and
//!    custody (escrow on create, disburse on terminal transitions)
//! 3. **AgreementStore**: records keyed by derived [`AgreementId`], with
//!    create / read / replace / delete primitives
//! 4. **AgreementIndex**: typed secondary index by payer / receiver / referee
//! 5. **SupplyConservation**: `Σ wallets + Σ custody == Σ funded − Σ withdrawn`
//!
//! [`AgreementId`]: escrowpay_types::AgreementId

pub mod agreement_store;
pub mod balance_manager;
pub mod executor;
pub mod index;
pub mod supply_conservation;

pub use agreement_store::AgreementStore;
pub use balance_manager::BalanceManager;
pub use executor::FundTransferExecutor;
pub use index::AgreementIndex;
pub use supply_conservation::SupplyConservation;
