//! The token pool a vesting contract pays claims from.

use std::sync::Arc;

use votetoken_ledger::TradableToken;
use votetoken_types::{Address, Amount, Result, VotetokenError};

/// A vesting contract's own ledger account on the shared token.
#[derive(Debug, Clone)]
pub struct VestingPool {
    address: Address,
    token: Arc<TradableToken>,
}

impl VestingPool {
    pub fn new(address: Address, token: Arc<TradableToken>) -> Result<Self> {
        if address.is_zero() {
            return Err(VotetokenError::ZeroAddress { role: "vesting pool" });
        }
        Ok(Self { address, token })
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn token(&self) -> &TradableToken {
        &self.token
    }

    /// Tokens still available for claims.
    #[must_use]
    pub fn balance(&self) -> Amount {
        self.token.balance_of(self.address)
    }

    /// Move `amount` from the pool to `to`.
    pub fn release(&self, to: Address, amount: Amount) -> Result<()> {
        self.token.transfer(self.address, to, amount)
    }
}
