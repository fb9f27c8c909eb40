//! Reserve-backed market: fee schedule, swap quotes and reserve accounting.
//!
//! ```text
//! buy:  fee = value × buy%  / 100   net = value − fee    tokens = net × price
//! sell: fee = amount × sell% / 100  net = amount − fee   payout = net / price
//! ```
//!
//! Quotes are pure; [`crate::TradableToken`] applies them to the ledger and
//! reserve inside its guarded section.

use votetoken_types::{Amount, Result, VotetokenError, constants};

/// Outcome of a `buy` before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyQuote {
    pub value: Amount,
    pub fee: Amount,
    pub net_value: Amount,
    pub tokens_out: Amount,
}

/// Outcome of a `sell` before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SellQuote {
    pub tokens_in: Amount,
    pub fee: Amount,
    pub net_tokens: Amount,
    pub payout: Amount,
}

fn check_percent(percent: u8) -> Result<()> {
    if percent > constants::MAX_FEE_PERCENT {
        return Err(VotetokenError::InvalidFeePercent(percent));
    }
    Ok(())
}

fn fee_of(amount: Amount, percent: u8, context: &'static str) -> Result<Amount> {
    amount
        .checked_mul(u128::from(percent))
        .map(|scaled| scaled / 100)
        .ok_or(VotetokenError::ArithmeticOverflow { context })
}

/// Reserve balance and fee parameters.
#[derive(Debug)]
pub struct Market {
    reserve: Amount,
    buy_fee_percent: u8,
    sell_fee_percent: u8,
}

impl Market {
    pub fn new(buy_fee_percent: u8, sell_fee_percent: u8) -> Result<Self> {
        check_percent(buy_fee_percent)?;
        check_percent(sell_fee_percent)?;
        Ok(Self {
            reserve: 0,
            buy_fee_percent,
            sell_fee_percent,
        })
    }

    #[must_use]
    pub fn reserve(&self) -> Amount {
        self.reserve
    }

    #[must_use]
    pub fn buy_fee_percent(&self) -> u8 {
        self.buy_fee_percent
    }

    #[must_use]
    pub fn sell_fee_percent(&self) -> u8 {
        self.sell_fee_percent
    }

    pub fn set_buy_fee_percent(&mut self, percent: u8) -> Result<()> {
        check_percent(percent)?;
        self.buy_fee_percent = percent;
        Ok(())
    }

    pub fn set_sell_fee_percent(&mut self, percent: u8) -> Result<()> {
        check_percent(percent)?;
        self.sell_fee_percent = percent;
        Ok(())
    }

    /// Price a purchase of `value` native units at `price`.
    ///
    /// # Errors
    /// - `ZeroPayment` if `value == 0`
    /// - `ArithmeticOverflow` if the token amount or reserve would overflow
    pub fn quote_buy(&self, value: Amount, price: Amount) -> Result<BuyQuote> {
        if value == 0 {
            return Err(VotetokenError::ZeroPayment);
        }
        let fee = fee_of(value, self.buy_fee_percent, "buy fee")?;
        let net_value = value - fee;
        let tokens_out = net_value
            .checked_mul(price)
            .ok_or(VotetokenError::ArithmeticOverflow { context: "buy amount" })?;
        self.reserve
            .checked_add(value)
            .ok_or(VotetokenError::ArithmeticOverflow { context: "reserve" })?;
        Ok(BuyQuote {
            value,
            fee,
            net_value,
            tokens_out,
        })
    }

    /// Price a sale of `tokens_in` at `price`.
    ///
    /// # Errors
    /// - `ZeroPrice` if the reference price is zero
    /// - `InsufficientReserve` if the reserve cannot cover the payout
    pub fn quote_sell(&self, tokens_in: Amount, price: Amount) -> Result<SellQuote> {
        if price == 0 {
            return Err(VotetokenError::ZeroPrice);
        }
        let fee = fee_of(tokens_in, self.sell_fee_percent, "sell fee")?;
        let net_tokens = tokens_in - fee;
        let payout = net_tokens / price;
        if payout > self.reserve {
            return Err(VotetokenError::InsufficientReserve {
                needed: payout,
                available: self.reserve,
            });
        }
        Ok(SellQuote {
            tokens_in,
            fee,
            net_tokens,
            payout,
        })
    }

    /// Add native currency to the reserve.
    pub fn credit_reserve(&mut self, value: Amount) -> Result<()> {
        self.reserve = self
            .reserve
            .checked_add(value)
            .ok_or(VotetokenError::ArithmeticOverflow { context: "reserve" })?;
        Ok(())
    }

    /// Remove native currency from the reserve.
    pub fn debit_reserve(&mut self, value: Amount) -> Result<()> {
        if value > self.reserve {
            return Err(VotetokenError::InsufficientReserve {
                needed: value,
                available: self.reserve,
            });
        }
        self.reserve -= value;
        Ok(())
    }
}
