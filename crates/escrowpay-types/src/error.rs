//! Error types for EscrowPay.
//!
//! All errors use the `EP_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by category:
//! - 1xx: Validation errors (bad creation inputs)
//! - 2xx: Authorization errors (wrong signer for the instruction)
//! - 3xx: State errors (record missing, terminal, or not yet expired)
//! - 4xx: Resource errors (balances and custody)
//! - 9xx: General / internal errors

use std::fmt;

use thiserror::Error;

use crate::{Address, AgreementId, InstructionKind, Timestamp};

/// Broad class of an [`EscrowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Validation,
    Authorization,
    State,
    Resource,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::State => write!(f, "STATE"),
            Self::Resource => write!(f, "RESOURCE"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Central error enum for all EscrowPay operations.
#[derive(Debug, Error)]
pub enum EscrowError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// Agreement name is empty or longer than the configured maximum.
    #[error("EP_ERR_100: Invalid name: length {len} not in 1..={max}")]
    InvalidName { len: usize, max: usize },

    /// Agreements must escrow a non-zero amount.
    #[error("EP_ERR_101: Amount must be greater than zero")]
    ZeroAmount,

    #[error("EP_ERR_102: Payer cannot be the same as receiver")]
    PayerCannotBeReceiver,

    #[error("EP_ERR_103: Referee cannot be the same as payer")]
    RefereeCannotBePayer,

    #[error("EP_ERR_104: Referee cannot be the same as receiver")]
    RefereeCannotBeReceiver,

    #[error("EP_ERR_105: Expiration {expiration} must be after current time {now}")]
    ExpirationMustBeInFuture {
        expiration: Timestamp,
        now: Timestamp,
    },

    // =================================================================
    // Authorization Errors (2xx)
    // =================================================================
    /// The signer holds no role permitted to invoke this instruction.
    #[error("EP_ERR_200: Unauthorized: {signer} may not invoke {action}")]
    Unauthorized {
        signer: Address,
        action: InstructionKind,
    },

    /// The instruction signature did not verify against the signer key.
    #[error("EP_ERR_201: Invalid instruction signature: {reason}")]
    InvalidSignature { reason: String },

    /// A signed instruction with this (signer, nonce) was already executed.
    #[error("EP_ERR_202: Signed instruction replayed: signer {signer} nonce {nonce}")]
    SignatureReplayed { signer: Address, nonce: u64 },

    // =================================================================
    // State Errors (3xx)
    // =================================================================
    /// No record at this id. Terminal transitions delete their record,
    /// so this is also what late instructions observe.
    #[error("EP_ERR_300: Agreement not found: {0}")]
    AgreementNotFound(AgreementId),

    #[error("EP_ERR_301: Agreement already exists: {0}")]
    AgreementAlreadyExists(AgreementId),

    #[error("EP_ERR_302: The payment agreement is already completed")]
    AgreementAlreadyCompleted,

    #[error("EP_ERR_303: The payment agreement is already cancelled")]
    AgreementAlreadyCancelled,

    /// Expiry withdrawal not allowed: no expiration, not yet reached, or
    /// the agreement is no longer pending.
    #[error("EP_ERR_304: Payment agreement has not expired")]
    PaymentAgreementNotExpired,

    // =================================================================
    // Resource Errors (4xx)
    // =================================================================
    #[error("EP_ERR_400: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    /// Custody holds less than a transition needs to move.
    #[error("EP_ERR_401: Custody shortfall for {id}: need {needed}, held {held}")]
    CustodyShortfall {
        id: AgreementId,
        needed: u64,
        held: u64,
    },

    /// Crediting would overflow a `u64` balance.
    #[error("EP_ERR_402: Balance overflow")]
    BalanceOverflow,

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Supply conservation invariant violated. Critical safety alert.
    #[error("EP_ERR_900: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    /// Configuration error (invalid config file, bad values, etc.).
    #[error("EP_ERR_901: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("EP_ERR_902: Serialization error: {0}")]
    Serialization(String),

    /// Unrecoverable internal error.
    #[error("EP_ERR_903: Internal error: {0}")]
    Internal(String),
}

impl EscrowError {
    /// Numeric code, e.g. `302` for `AgreementAlreadyCompleted`.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::InvalidName { .. } => 100,
            Self::ZeroAmount => 101,
            Self::PayerCannotBeReceiver => 102,
            Self::RefereeCannotBePayer => 103,
            Self::RefereeCannotBeReceiver => 104,
            Self::ExpirationMustBeInFuture { .. } => 105,
            Self::Unauthorized { .. } => 200,
            Self::InvalidSignature { .. } => 201,
            Self::SignatureReplayed { .. } => 202,
            Self::AgreementNotFound(_) => 300,
            Self::AgreementAlreadyExists(_) => 301,
            Self::AgreementAlreadyCompleted => 302,
            Self::AgreementAlreadyCancelled => 303,
            Self::PaymentAgreementNotExpired => 304,
            Self::InsufficientFunds { .. } => 400,
            Self::CustodyShortfall { .. } => 401,
            Self::BalanceOverflow => 402,
            Self::SupplyInvariantViolation { .. } => 900,
            Self::Configuration(_) => 901,
            Self::Serialization(_) => 902,
            Self::Internal(_) => 903,
        }
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self.code() {
            100..=199 => ErrorCategory::Validation,
            200..=299 => ErrorCategory::Authorization,
            300..=399 => ErrorCategory::State,
            400..=499 => ErrorCategory::Resource,
            _ => ErrorCategory::Internal,
        }
    }

    /// Whether a caller should treat this as "the agreement is not pending".
    /// A deleted record is equivalent to a terminal one.
    #[must_use]
    pub fn is_terminal_state(&self) -> bool {
        matches!(
            self,
            Self::AgreementNotFound(_)
                | Self::AgreementAlreadyCompleted
                | Self::AgreementAlreadyCancelled
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, EscrowError>;

impl From<serde_json::Error> for EscrowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
