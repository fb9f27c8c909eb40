//! # votetoken-ledger
//!
//! The tradable token: a fungible ledger with vote locks, single-round
//! balance-weighted price voting, and a reserve market that mints on `buy`
//! and burns on `sell`.
//!
//! ## Layout
//!
//! - [`ledger`]: balances, allowances, supply, round-tagged vote locks
//! - [`price_vote`]: round lifecycle, incremental leader tracking
//! - [`market`]: fee schedule, swap quotes, reserve accounting
//! - [`reentrancy`]: per-instance guard held by every mutating call
//! - [`payout`]: outbound native payments for `sell`
//! - [`token`]: [`TradableToken`], the composed instance
//!
//! ## Invariants
//!
//! - Σ balances == total supply after every operation
//! - locked(a) ≤ balance(a) while a round is open; zero otherwise
//! - a failed call leaves no state change and emits no event

pub mod ledger;
pub mod market;
pub mod payout;
pub mod price_vote;
pub mod reentrancy;
pub mod token;

pub use ledger::Ledger;
pub use market::{BuyQuote, Market, SellQuote};
pub use payout::{NativeRecipient, NativeWallet};
pub use price_vote::{PriceVote, RoundSummary, VoteRound};
pub use reentrancy::{Entered, ReentrancyGuard};
pub use token::TradableToken;
