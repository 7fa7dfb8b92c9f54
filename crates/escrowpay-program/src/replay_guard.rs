//! Signed-instruction replay guard.
//!
//! Each (signer, nonce) pair may execute once. The guard keeps a bounded
//! FIFO of consumed pairs so memory stays predictable; a pair evicted from
//! the window is no longer recognised.

use std::collections::{HashSet, VecDeque};

use escrowpay_types::{Address, EscrowError, Result};

/// Rejects a (signer, nonce) pair that already executed.
#[derive(Debug)]
pub struct ReplayGuard {
    seen: HashSet<(Address, u64)>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<(Address, u64)>,
    max_size: usize,
}

impl ReplayGuard {
    /// # Errors
    /// `Configuration` if `max_size` is zero.
    pub fn new(max_size: usize) -> Result<Self> {
        if max_size == 0 {
            return Err(EscrowError::Configuration(
                "replay_cache_size must be > 0".into(),
            ));
        }
        Ok(Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            max_size,
        })
    }

    /// # Errors
    /// `SignatureReplayed` if the pair was already consumed.
    pub fn check(&self, signer: Address, nonce: u64) -> Result<()> {
        if self.seen.contains(&(signer, nonce)) {
            return Err(EscrowError::SignatureReplayed { signer, nonce });
        }
        Ok(())
    }

    /// Consume a pair. Call only after the instruction succeeded.
    pub fn mark(&mut self, signer: Address, nonce: u64) {
        if !self.seen.insert((signer, nonce)) {
            return;
        }
        self.order.push_back((signer, nonce));
        if self.order.len() > self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
