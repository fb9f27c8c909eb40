//! # votetoken-vesting
//!
//! Three ways to release tokens from a pre-funded pool. Each contract owns a
//! ledger address on a shared [`TradableToken`](votetoken_ledger::TradableToken);
//! the admin funds it with an ordinary transfer and claims pay out of it.
//!
//! | Contract             | Allocation                     | Claim authorized by        |
//! |----------------------|--------------------------------|----------------------------|
//! | [`LinearVesting`]    | per-recipient entry with cliff | time + remaining allowance |
//! | [`MerkleVesting`]    | one committed root             | inclusion proof, once      |
//! | [`SignatureVesting`] | off-band                       | ed25519 signature + nonce  |

pub mod linear;
pub mod merkle;
pub mod merkle_vesting;
pub mod nonce;
pub mod pool;
pub mod signature;

pub use linear::{LinearVesting, VestingEntry};
pub use merkle::{Hash32, MerkleTree, hash_pair, leaf_hash, process_proof, verify_proof};
pub use merkle_vesting::MerkleVesting;
pub use nonce::NonceRegistry;
pub use pool::VestingPool;
pub use signature::{SignatureVesting, claim_message, sign_claim};
