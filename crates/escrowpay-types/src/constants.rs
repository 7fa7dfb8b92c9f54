//! System-wide constants for EscrowPay.

/// Fixed seed tag that leads every agreement id derivation.
pub const AGREEMENT_SEED: &[u8] = b"payment_agreement";

/// Domain separator for agreement id hashing.
pub const AGREEMENT_ID_DOMAIN: &[u8] = b"escrowpay:agreement_id:v1:";

/// Domain separator for signed instruction payloads.
pub const INSTRUCTION_DOMAIN: &[u8] = b"escrowpay:instruction:v1:";

/// Domain separator for agreement snapshot hashes carried by receipts.
pub const SNAPSHOT_DOMAIN: &[u8] = b"escrowpay:snapshot:v1:";

/// Maximum agreement name length in bytes.
pub const MAX_NAME_LEN: usize = 32;

/// Account discriminator prefix in the persisted record layout.
pub const DISCRIMINATOR_LEN: usize = 8;

/// Maximum size of an encoded `PaymentAgreement`:
/// discriminator(8) + name(4 + 32) + payer(32) + receiver(32) + referee(1 + 32)
/// + amount(8) + expiration(1 + 8) + flags(7) + created_at(8).
pub const AGREEMENT_SPACE: usize =
    DISCRIMINATOR_LEN + 4 + MAX_NAME_LEN + 32 + 32 + 33 + 8 + 9 + 7 + 8;

/// Per-account bookkeeping bytes charged on top of the record itself.
pub const ACCOUNT_OVERHEAD: usize = 128;

/// Default storage deposit rate in native units per byte.
pub const DEFAULT_DEPOSIT_PER_BYTE: u64 = 6_960;

/// Default number of (signer, nonce) pairs remembered by the replay guard.
pub const DEFAULT_REPLAY_CACHE_SIZE: usize = 100_000;

/// Label hashed into the default program identity.
pub const DEFAULT_PROGRAM_LABEL: &str = "escrowpay:program:v1";
