//! Batch allocations committed as one Merkle root.
//!
//! The admin publishes a root built off-band (see [`MerkleTree`]); each
//! recipient later proves inclusion of `(recipient, amount)` and is paid once.
//! Replacing the root does not reopen leaves that were already claimed.
//!
//! [`MerkleTree`]: crate::merkle::MerkleTree

use std::{collections::HashSet, sync::Arc};

use votetoken_ledger::TradableToken;
use votetoken_types::{Address, Amount, Clock, Event, EventLog, EventRecord, Result, VotetokenError};

use crate::{
    merkle::{Hash32, leaf_hash, verify_proof},
    pool::VestingPool,
};

/// Merkle-claim vesting contract.
pub struct MerkleVesting {
    admin: Address,
    pool: VestingPool,
    clock: Arc<dyn Clock>,
    root: Option<Hash32>,
    claimed: HashSet<Hash32>,
    events: EventLog,
}

impl MerkleVesting {
    pub fn new(
        address: Address,
        admin: Address,
        token: Arc<TradableToken>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if admin.is_zero() {
            return Err(VotetokenError::ZeroAddress { role: "admin" });
        }
        Ok(Self {
            admin,
            pool: VestingPool::new(address, token)?,
            clock,
            root: None,
            claimed: HashSet::new(),
            events: EventLog::new(address),
        })
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.pool.address()
    }

    #[must_use]
    pub fn admin(&self) -> Address {
        self.admin
    }

    #[must_use]
    pub fn pool_balance(&self) -> Amount {
        self.pool.balance()
    }

    /// The committed root, if one has been set.
    #[must_use]
    pub fn claim_merkle_root(&self) -> Option<Hash32> {
        self.root
    }

    #[must_use]
    pub fn is_claimed(&self, recipient: Address, amount: Amount) -> bool {
        self.claimed.contains(&leaf_hash(recipient, amount))
    }

    /// Replace the committed root wholesale.
    pub fn set_root(&mut self, caller: Address, root: Hash32) -> Result<()> {
        if caller != self.admin {
            tracing::warn!(caller = %caller, "Root update rejected: not admin");
            return Err(VotetokenError::NotAdmin(caller));
        }
        self.root = Some(root);
        self.events
            .emit(self.clock.now(), Event::MerkleRootUpdated { root });
        tracing::info!(root = %hex::encode(root), "Merkle root updated");
        Ok(())
    }

    /// Commit a new allocation batch; same as [`Self::set_root`].
    pub fn vest_tokens(&mut self, caller: Address, root: Hash32) -> Result<()> {
        self.set_root(caller, root)
    }

    /// Pay `amount` to `recipient` on a valid inclusion proof. Anyone may
    /// submit the claim; the tokens always go to `recipient`.
    ///
    /// # Errors
    /// - `InvalidProof` if no root is set or the proof does not reach it
    /// - `AlreadyClaimed` if this leaf has been paid
    /// - the token's errors if the pool cannot pay
    pub fn claim(&mut self, recipient: Address, amount: Amount, proof: &[Hash32]) -> Result<()> {
        let leaf = leaf_hash(recipient, amount);
        let valid = self
            .root
            .is_some_and(|root| verify_proof(proof, &root, leaf));
        if !valid {
            tracing::warn!(recipient = %recipient, amount, "Merkle claim with invalid proof");
            return Err(VotetokenError::InvalidProof);
        }
        if self.claimed.contains(&leaf) {
            tracing::warn!(recipient = %recipient, amount, "Merkle leaf claimed twice");
            return Err(VotetokenError::AlreadyClaimed(hex::encode(leaf)));
        }

        self.pool.release(recipient, amount)?;
        self.claimed.insert(leaf);
        self.events
            .emit(self.clock.now(), Event::TokensClaimed { recipient, amount });
        tracing::info!(recipient = %recipient, amount, "Merkle vesting claimed");
        Ok(())
    }

    #[must_use]
    pub fn events(&self) -> &[EventRecord] {
        self.events.records()
    }
}
