//! # escrowpay-program
//!
//! **Instruction processor**: authorization, state transitions, replay
//! protection and the receipt journal.
//!
//! ## Flow
//!
//! ```text
//! SignedInstruction ─▶ verify ed25519 ─▶ replay check ─▶ execute
//!                                                          │
//!                          ┌───────────────────────────────┘
//!                          ▼
//!   load record ─▶ guard::authorize ─▶ ensure pending ─▶ write flag
//!                                                          │
//!                              both flags set / referee / expiry?
//!                                                          │
//!                       disburse custody ─▶ delete record ─▶ Receipt
//! ```
//!
//! Time comes from an injected [`Clock`]; logging is set up once per
//! process with [`telemetry::init_logging`].

pub mod clock;
pub mod guard;
pub mod handlers;
pub mod processor;
pub mod replay_guard;
pub mod telemetry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use processor::EscrowProgram;
pub use replay_guard::ReplayGuard;
pub use telemetry::{LogFormat, init_logging};
