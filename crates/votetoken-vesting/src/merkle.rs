//! Sorted-pair SHA-256 Merkle trees over `(recipient, amount)` leaves.
//!
//! ```text
//! leaf = SHA-256(MERKLE_LEAF_TAG ‖ recipient[20] ‖ amount as u256 BE[32])
//! node = SHA-256(min(a, b) ‖ max(a, b))
//! ```
//!
//! Sorting each pair makes a proof a plain list of sibling hashes with no
//! left/right flags. When a level has an odd node out it is carried to the
//! next level unchanged, so it contributes no proof element at that level.

use sha2::{Digest, Sha256};
use votetoken_types::{Address, Amount, Result, VotetokenError, constants};

/// A 32-byte SHA-256 digest.
pub type Hash32 = [u8; 32];

/// Leaf commitment for one allocation.
#[must_use]
pub fn leaf_hash(recipient: Address, amount: Amount) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(constants::MERKLE_LEAF_TAG);
    hasher.update(recipient.as_bytes());
    hasher.update([0u8; 16]);
    hasher.update(amount.to_be_bytes());
    hasher.finalize().into()
}

/// Parent of two nodes, smaller operand first.
#[must_use]
pub fn hash_pair(a: &Hash32, b: &Hash32) -> Hash32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Sha256::new();
    hasher.update(lo);
    hasher.update(hi);
    hasher.finalize().into()
}

/// Fold `proof` onto `leaf`, yielding the implied root.
#[must_use]
pub fn process_proof(leaf: Hash32, proof: &[Hash32]) -> Hash32 {
    proof
        .iter()
        .fold(leaf, |node, sibling| hash_pair(&node, sibling))
}

#[must_use]
pub fn verify_proof(proof: &[Hash32], root: &Hash32, leaf: Hash32) -> bool {
    process_proof(leaf, proof) == *root
}

/// A complete tree, kept level by level so proofs can be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    /// `levels[0]` are the leaves; the last level holds the root alone.
    levels: Vec<Vec<Hash32>>,
}

impl MerkleTree {
    /// Build from precomputed leaves, in order.
    ///
    /// # Errors
    /// `InvalidConfiguration` if `leaves` is empty.
    pub fn new(leaves: Vec<Hash32>) -> Result<Self> {
        if leaves.is_empty() {
            return Err(VotetokenError::InvalidConfiguration(
                "merkle tree needs at least one leaf".into(),
            ));
        }
        let mut levels = vec![leaves];
        while let Some(level) = levels.last().filter(|l| l.len() > 1) {
            let next: Vec<Hash32> = level
                .chunks(2)
                .map(|pair| match pair {
                    [a, b] => hash_pair(a, b),
                    _ => pair[0],
                })
                .collect();
            levels.push(next);
        }
        Ok(Self { levels })
    }

    /// Build from `(recipient, amount)` allocations.
    pub fn from_allocations(allocations: &[(Address, Amount)]) -> Result<Self> {
        Self::new(
            allocations
                .iter()
                .map(|&(recipient, amount)| leaf_hash(recipient, amount))
                .collect(),
        )
    }

    #[must_use]
    pub fn root(&self) -> Hash32 {
        self.levels
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn leaf(&self, index: usize) -> Option<Hash32> {
        self.levels.first()?.get(index).copied()
    }

    /// Sibling path for the leaf at `index`, bottom-up.
    #[must_use]
    pub fn proof(&self, index: usize) -> Option<Vec<Hash32>> {
        if index >= self.leaf_count() {
            return None;
        }
        let mut proof = Vec::new();
        let mut idx = index;
        for level in &self.levels[..self.levels.len() - 1] {
            if let Some(sibling) = level.get(idx ^ 1) {
                proof.push(*sibling);
            }
            idx /= 2;
        }
        Some(proof)
    }
}
