//! Append-only event stream.
//!
//! Every successful state transition emits one or more [`Event`]s,
//! synchronously and in execution order. Failed operations emit nothing.
//! Each instance (token, vesting contract) owns one [`EventLog`]; records
//! are numbered from zero so observers can poll with
//! [`EventLog::since`].

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, RoundId};

/// Which fee parameter an admin changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeKind {
    Buy,
    Sell,
}

/// An externally observable state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Tokens moved. `from == ZERO` is a mint, `to == ZERO` a burn.
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
    /// An allowance was set.
    Approval {
        owner: Address,
        spender: Address,
        amount: Amount,
    },
    /// A price-vote round opened.
    VoteInitiated {
        round: RoundId,
        proposed_price: Amount,
        initiator: Address,
    },
    /// A holder cast a balance-weighted vote.
    Voted {
        round: RoundId,
        price: Amount,
        weight: Amount,
        voter: Address,
    },
    /// A round closed and the reference price was set.
    VoteFinalized { round: RoundId, winning_price: Amount },
    /// Native currency swapped in for freshly minted tokens.
    TokensPurchased {
        buyer: Address,
        value: Amount,
        fee: Amount,
        tokens: Amount,
    },
    /// Tokens burned for a native-currency payout.
    TokensSold {
        seller: Address,
        tokens: Amount,
        fee: Amount,
        payout: Amount,
    },
    /// Native currency added to the reserve outside of a buy.
    ReserveDeposited { from: Address, value: Amount },
    /// An admin changed a fee percentage.
    FeeUpdated { kind: FeeKind, percent: u8 },
    /// An admin changed the voting window.
    VotingDurationUpdated { secs: u64 },
    /// A linear-vesting allocation was written.
    VestingAllocated {
        recipient: Address,
        amount: Amount,
        cliff: u64,
    },
    /// A new Merkle claim root was committed.
    MerkleRootUpdated { root: [u8; 32] },
    /// The signature-claim authorizer was rotated.
    AuthorizerUpdated { authorizer: [u8; 32] },
    /// Vested tokens were released to a recipient.
    TokensClaimed { recipient: Address, amount: Amount },
}

impl Event {
    /// Short name of the event kind, for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Transfer { .. } => "Transfer",
            Self::Approval { .. } => "Approval",
            Self::VoteInitiated { .. } => "VoteInitiated",
            Self::Voted { .. } => "Voted",
            Self::VoteFinalized { .. } => "VoteFinalized",
            Self::TokensPurchased { .. } => "TokensPurchased",
            Self::TokensSold { .. } => "TokensSold",
            Self::ReserveDeposited { .. } => "ReserveDeposited",
            Self::FeeUpdated { .. } => "FeeUpdated",
            Self::VotingDurationUpdated { .. } => "VotingDurationUpdated",
            Self::VestingAllocated { .. } => "VestingAllocated",
            Self::MerkleRootUpdated { .. } => "MerkleRootUpdated",
            Self::AuthorizerUpdated { .. } => "AuthorizerUpdated",
            Self::TokensClaimed { .. } => "TokensClaimed",
        }
    }
}

/// An event stamped with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Zero-based position in the emitter's log.
    pub seq: u64,
    /// Instance that emitted the event.
    pub emitter: Address,
    /// Unix seconds at emission.
    pub timestamp: u64,
    pub event: Event,
}

/// Ordered, append-only log of events for one instance.
#[derive(Debug, Clone)]
pub struct EventLog {
    emitter: Address,
    records: Vec<EventRecord>,
}

impl EventLog {
    #[must_use]
    pub fn new(emitter: Address) -> Self {
        Self {
            emitter,
            records: Vec::new(),
        }
    }

    /// Append an event. Returns its sequence number.
    pub fn emit(&mut self, timestamp: u64, event: Event) -> u64 {
        let seq = self.records.len() as u64;
        self.records.push(EventRecord {
            seq,
            emitter: self.emitter,
            timestamp,
            event,
        });
        seq
    }

    /// All records, oldest first.
    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with `seq >= from`.
    #[must_use]
    pub fn since(&self, from: u64) -> &[EventRecord] {
        let start = usize::try_from(from).unwrap_or(usize::MAX).min(self.records.len());
        &self.records[start..]
    }

    /// Most recent record, if any.
    #[must_use]
    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
