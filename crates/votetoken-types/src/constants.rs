//! System-wide constants for the votetoken ledger.

/// Fractional decimal places of the token.
pub const DEFAULT_DECIMALS: u8 = 18;

/// One whole token in raw units (10^18).
pub const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

/// Default voting window: 7 days in seconds.
pub const DEFAULT_VOTING_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Default reference price (raw token units per native unit).
pub const DEFAULT_REFERENCE_PRICE: u128 = 1;

/// Default fee taken on `buy`, in percent of the native payment.
pub const DEFAULT_BUY_FEE_PERCENT: u8 = 2;

/// Default fee taken on `sell`, in percent of the token amount.
pub const DEFAULT_SELL_FEE_PERCENT: u8 = 2;

/// Upper bound for fee percentages.
pub const MAX_FEE_PERCENT: u8 = 100;

/// Default minimum free balance to propose or vote, in basis points of
/// total supply (5 bps = 0.05 %).
pub const DEFAULT_MIN_VOTE_BALANCE_BPS: u32 = 5;

/// Basis-point denominator.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Default linear-vesting cliff: two 365-day years in seconds.
pub const DEFAULT_VESTING_CLIFF_SECS: u64 = 2 * 365 * 24 * 60 * 60;

/// First round id handed out by the price vote.
pub const FIRST_ROUND_ID: u64 = 1;

/// Domain tag for Merkle leaves.
pub const MERKLE_LEAF_TAG: &[u8] = b"votetoken:merkle:leaf:v1:";

/// Domain tag for signature-authorized claim messages.
pub const CLAIM_MESSAGE_TAG: &[u8] = b"votetoken:claim:v1:";
