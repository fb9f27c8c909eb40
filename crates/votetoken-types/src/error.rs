//! Error types for the votetoken ledger.
//!
//! Every failure carries a stable string key (see [`VotetokenError::reason`])
//! and every Display message starts with that key, so logs and callers can
//! branch on the cause without parsing prose. Errors are grouped by the
//! kind of rule they enforce:
//! - input validation
//! - authorization
//! - state machine
//! - resources
//! - configuration / internal

use thiserror::Error;

use crate::{Address, Amount, RoundId};

/// Central error enum for all votetoken operations.
///
/// Any operation returning an error has left state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VotetokenError {
    // =================================================================
    // Input validation
    // =================================================================
    /// A from/to/owner/spender/recipient was the null address.
    #[error("ZeroAddress: {role} is the zero address")]
    ZeroAddress { role: &'static str },

    /// Parallel input arrays had different lengths.
    #[error("LengthMismatch: {left} recipients vs {right} amounts")]
    LengthMismatch { left: usize, right: usize },

    /// `buy` was called without any native currency attached.
    #[error("ZeroPayment: native currency required to buy tokens")]
    ZeroPayment,

    /// A price proposal of zero was submitted.
    #[error("ZeroPrice: proposed price must be non-zero")]
    ZeroPrice,

    /// A fee percentage outside [0, 100].
    #[error("InvalidFeePercent: {0} is outside 0..=100")]
    InvalidFeePercent(u8),

    /// Checked arithmetic overflowed.
    #[error("ArithmeticOverflow: {context}")]
    ArithmeticOverflow { context: &'static str },

    // =================================================================
    // Authorization
    // =================================================================
    /// The caller is not the designated admin.
    #[error("NotAdmin: caller {0} is not an admin")]
    NotAdmin(Address),

    /// The claim signature was not produced by the authorizer.
    #[error("InvalidSignature: claim not signed by the authorizer")]
    InvalidSignature,

    /// The Merkle proof does not reconstruct the committed root.
    #[error("InvalidProof: proof does not match the committed root")]
    InvalidProof,

    // =================================================================
    // State machine
    // =================================================================
    /// `initiate_vote` while a round is still open.
    #[error("ActiveVoteOngoing: round {0} is still open")]
    ActiveVoteOngoing(RoundId),

    /// No round is open (or none was ever created).
    #[error("InvalidRound: no open voting round")]
    InvalidRound,

    /// The voting window of the open round has closed.
    #[error("VotingPeriodEnded: round {0} no longer accepts votes")]
    VotingPeriodEnded(RoundId),

    /// Finalization attempted while the window is still open.
    #[error("VotingPeriodNotEnded: round {round} ends at {ends_at}")]
    VotingPeriodNotEnded { round: RoundId, ends_at: u64 },

    /// The caller has already voted in this round.
    #[error("AlreadyVoted: {voter} already voted in round {round}")]
    AlreadyVoted { round: RoundId, voter: Address },

    /// The latest round has already been finalized.
    #[error("AlreadyFinalized: round {0} already finalized")]
    AlreadyFinalized(RoundId),

    /// The Merkle leaf has already been claimed.
    #[error("AlreadyClaimed: leaf {0} already claimed")]
    AlreadyClaimed(String),

    /// The (recipient, nonce) pair has already been consumed.
    #[error("NonceAlreadyUsed: nonce {nonce} already used by {recipient}")]
    NonceAlreadyUsed { recipient: Address, nonce: u64 },

    /// A state-mutating call arrived while another guarded call was running.
    #[error("ReentrantCall: {operation} rejected while a guarded call is in progress")]
    ReentrantCall { operation: &'static str },

    // =================================================================
    // Resources
    // =================================================================
    /// Amount exceeds the account's free (unlocked) balance.
    #[error("InsufficientBalance: need {needed}, free {available}")]
    InsufficientBalance { needed: Amount, available: Amount },

    /// Amount exceeds the remaining allowance.
    #[error("InsufficientAllowance: need {needed}, allowed {allowed}")]
    InsufficientAllowance { needed: Amount, allowed: Amount },

    /// The reserve cannot cover a sell payout.
    #[error("InsufficientReserve: need {needed}, reserve {available}")]
    InsufficientReserve { needed: Amount, available: Amount },

    /// Claimed + requested would exceed the allocation.
    #[error("ClaimExceedsAllocation: claimed {claimed} + {requested} > allocated {allocated}")]
    ClaimExceedsAllocation {
        claimed: Amount,
        requested: Amount,
        allocated: Amount,
    },

    /// The vesting cliff has not been reached.
    #[error("CliffNotPassed: claimable from {cliff}, now {now}")]
    CliffNotPassed { cliff: u64, now: u64 },

    /// The native-currency payment to the seller failed; the sell was undone.
    #[error("PaymentFailed: {reason}")]
    PaymentFailed { reason: String },

    // =================================================================
    // Configuration / internal
    // =================================================================
    /// Invalid configuration value.
    #[error("InvalidConfiguration: {0}")]
    InvalidConfiguration(String),

    /// Σ balances diverged from total supply.
    #[error("SupplyInvariantViolation: {reason}")]
    SupplyInvariantViolation { reason: String },

    /// Serialization / deserialization error.
    #[error("Serialization: {0}")]
    Serialization(String),
}

impl VotetokenError {
    /// Stable string key for programmatic matching.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ZeroAddress { .. } => "ZeroAddress",
            Self::LengthMismatch { .. } => "LengthMismatch",
            Self::ZeroPayment => "ZeroPayment",
            Self::ZeroPrice => "ZeroPrice",
            Self::InvalidFeePercent(_) => "InvalidFeePercent",
            Self::ArithmeticOverflow { .. } => "ArithmeticOverflow",
            Self::NotAdmin(_) => "NotAdmin",
            Self::InvalidSignature => "InvalidSignature",
            Self::InvalidProof => "InvalidProof",
            Self::ActiveVoteOngoing(_) => "ActiveVoteOngoing",
            Self::InvalidRound => "InvalidRound",
            Self::VotingPeriodEnded(_) => "VotingPeriodEnded",
            Self::VotingPeriodNotEnded { .. } => "VotingPeriodNotEnded",
            Self::AlreadyVoted { .. } => "AlreadyVoted",
            Self::AlreadyFinalized(_) => "AlreadyFinalized",
            Self::AlreadyClaimed(_) => "AlreadyClaimed",
            Self::NonceAlreadyUsed { .. } => "NonceAlreadyUsed",
            Self::ReentrantCall { .. } => "ReentrantCall",
            Self::InsufficientBalance { .. } => "InsufficientBalance",
            Self::InsufficientAllowance { .. } => "InsufficientAllowance",
            Self::InsufficientReserve { .. } => "InsufficientReserve",
            Self::ClaimExceedsAllocation { .. } => "ClaimExceedsAllocation",
            Self::CliffNotPassed { .. } => "CliffNotPassed",
            Self::PaymentFailed { .. } => "PaymentFailed",
            Self::InvalidConfiguration(_) => "InvalidConfiguration",
            Self::SupplyInvariantViolation { .. } => "SupplyInvariantViolation",
            Self::Serialization(_) => "Serialization",
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, VotetokenError>;

impl From<serde_json::Error> for VotetokenError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_starts_with_reason() {
        let errors = vec![
            VotetokenError::ZeroPayment,
            VotetokenError::InvalidRound,
            VotetokenError::InvalidSignature,
            VotetokenError::AlreadyFinalized(RoundId(3)),
            VotetokenError::ZeroAddress { role: "recipient" },
            VotetokenError::ReentrantCall { operation: "sell" },
            VotetokenError::CliffNotPassed { cliff: 10, now: 5 },
        ];
        for err in errors {
            let msg = err.to_string();
            assert!(
                msg.starts_with(err.reason()),
                "message {msg:?} should start with {:?}",
                err.reason()
            );
        }
    }

    #[test]
    fn insufficient_balance_display() {
        let err = VotetokenError::InsufficientBalance {
            needed: 100,
            available: 50,
        };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
        assert_eq!(err.reason(), "InsufficientBalance");
    }

    #[test]
    fn serde_error_converts() {
        let err: VotetokenError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.reason(), "Serialization");
    }
}
