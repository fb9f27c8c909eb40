//! Configuration types for token and vesting instances.

use serde::{Deserialize, Serialize};

use crate::{Amount, Result, VotetokenError, constants};

/// Initializer parameters for a tradable, price-voting token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Human-readable token name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Fractional decimal places.
    pub decimals: u8,
    /// Raw supply credited to the admin at creation.
    pub total_supply: Amount,
    /// Length of a price-vote round in seconds.
    pub voting_duration_secs: u64,
    /// Reference price before any vote has been finalized.
    pub initial_price: Amount,
    /// Fee on `buy`, percent of the native payment.
    pub buy_fee_percent: u8,
    /// Fee on `sell`, percent of the token amount.
    pub sell_fee_percent: u8,
    /// Minimum free balance to propose or vote, in bps of total supply.
    pub min_vote_balance_bps: u32,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: "MyToken".to_string(),
            symbol: "MTN".to_string(),
            decimals: constants::DEFAULT_DECIMALS,
            total_supply: 1_000_000_000 * constants::ONE_TOKEN,
            voting_duration_secs: constants::DEFAULT_VOTING_DURATION_SECS,
            initial_price: constants::DEFAULT_REFERENCE_PRICE,
            buy_fee_percent: constants::DEFAULT_BUY_FEE_PERCENT,
            sell_fee_percent: constants::DEFAULT_SELL_FEE_PERCENT,
            min_vote_balance_bps: constants::DEFAULT_MIN_VOTE_BALANCE_BPS,
        }
    }
}

impl TokenConfig {
    /// Config with the five initializer parameters and defaults elsewhere.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
        total_supply: Amount,
        voting_duration_secs: u64,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
            total_supply,
            voting_duration_secs,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values no instance could operate with.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.symbol.is_empty() {
            return Err(VotetokenError::InvalidConfiguration(
                "name and symbol must be non-empty".into(),
            ));
        }
        if self.voting_duration_secs == 0 {
            return Err(VotetokenError::InvalidConfiguration(
                "voting duration must be non-zero".into(),
            ));
        }
        if self.initial_price == 0 {
            return Err(VotetokenError::InvalidConfiguration(
                "initial price must be non-zero".into(),
            ));
        }
        if self.buy_fee_percent > constants::MAX_FEE_PERCENT {
            return Err(VotetokenError::InvalidFeePercent(self.buy_fee_percent));
        }
        if self.sell_fee_percent > constants::MAX_FEE_PERCENT {
            return Err(VotetokenError::InvalidFeePercent(self.sell_fee_percent));
        }
        if u128::from(self.min_vote_balance_bps) > constants::BPS_DENOMINATOR {
            return Err(VotetokenError::InvalidConfiguration(format!(
                "min vote balance {} bps exceeds 100%",
                self.min_vote_balance_bps
            )));
        }
        Ok(())
    }
}

/// Parameters for a linear (cliff) vesting instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VestingConfig {
    /// Seconds between allocation and the cliff.
    pub cliff_duration_secs: u64,
}

impl Default for VestingConfig {
    fn default() -> Self {
        Self {
            cliff_duration_secs: constants::DEFAULT_VESTING_CLIFF_SECS,
        }
    }
}

impl VestingConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
