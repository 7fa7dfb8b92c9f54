//! # escrowpay-types
//!
//! Shared types, errors, and configuration for **EscrowPay**.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Addresses**: [`Address`], [`ProgramId`]
//! - **Identifiers**: [`AgreementId`] (derived from payer + name), [`ReceiptId`]
//! - **Time**: [`Timestamp`]
//! - **Agreement model**: [`PaymentAgreement`], [`AgreementStatus`], [`Role`]
//! - **Instruction model**: [`Instruction`], [`AgreementRef`], [`SignedInstruction`]
//! - **Receipt model**: [`Receipt`], [`ReceiptType`]
//! - **Configuration**: [`ProgramConfig`]
//! - **Errors**: [`EscrowError`] with `EP_ERR_` prefix codes
//! - **Constants**: record layout sizes, seeds and defaults

pub mod address;
pub mod agreement;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod instruction;
pub mod receipt;
pub mod time;

// Re-export all primary types at crate root for ergonomic imports:
//   use escrowpay_types::{Address, PaymentAgreement, Instruction, ...};

pub use address::*;
pub use agreement::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use instruction::*;
pub use receipt::*;
pub use time::*;

// Constants are accessed via `escrowpay_types::constants::FOO`
// (not re-exported to avoid name collisions).
