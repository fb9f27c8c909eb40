//! Replay protection for signed claims.
//!
//! Each `(recipient, nonce)` pair may be consumed once. Entries are never
//! evicted: a signature stays valid forever, so forgetting its nonce would
//! reopen it.

use std::collections::{HashMap, HashSet};

use votetoken_types::{Address, Result, VotetokenError};

/// Consumed nonces per recipient.
#[derive(Debug, Default)]
pub struct NonceRegistry {
    used: HashMap<Address, HashSet<u64>>,
}

impl NonceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_used(&self, recipient: Address, nonce: u64) -> bool {
        self.used
            .get(&recipient)
            .is_some_and(|nonces| nonces.contains(&nonce))
    }

    /// Record `nonce` for `recipient`.
    ///
    /// # Errors
    /// `NonceAlreadyUsed` if the pair was consumed before.
    pub fn consume(&mut self, recipient: Address, nonce: u64) -> Result<()> {
        let nonces = self.used.entry(recipient).or_default();
        if !nonces.insert(nonce) {
            return Err(VotetokenError::NonceAlreadyUsed { recipient, nonce });
        }
        Ok(())
    }

    /// Total consumed pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.used.values().map(HashSet::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used.values().all(HashSet::is_empty)
    }
}
