//! The tradable, price-voting token instance.
//!
//! [`TradableToken`] composes the [`Ledger`], [`PriceVote`] and [`Market`]
//! behind a single per-instance [`ReentrancyGuard`]. Every public mutating
//! operation:
//!
//! 1. enters the guard (other threads wait; nested calls on the holding
//!    thread fail with `ReentrantCall`)
//! 2. validates everything before the first write
//! 3. applies the change and appends its events
//!
//! The caller identity is always an explicit, externally authenticated
//! parameter. The state mutex is never held while foreign code runs, so a
//! payout callback may still read balances.

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use votetoken_types::{
    Address, Amount, Clock, Event, EventLog, EventRecord, FeeKind, Result, TokenConfig,
    VotetokenError,
};

use crate::{
    ledger::Ledger,
    market::Market,
    payout::NativeRecipient,
    price_vote::{PriceVote, RoundSummary},
    reentrancy::ReentrancyGuard,
};

/// Mutable state, guarded by one mutex.
struct TokenState {
    ledger: Ledger,
    vote: PriceVote,
    market: Market,
    events: EventLog,
}

/// A self-custodial token with price governance and a reserve market.
pub struct TradableToken {
    address: Address,
    admin: Address,
    name: String,
    symbol: String,
    decimals: u8,
    clock: Arc<dyn Clock>,
    guard: ReentrancyGuard,
    state: Mutex<TokenState>,
}

impl fmt::Debug for TradableToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TradableToken")
            .field("address", &self.address)
            .field("admin", &self.admin)
            .field("symbol", &self.symbol)
            .finish_non_exhaustive()
    }
}

impl TradableToken {
    /// Create the token and credit the whole supply to `admin`.
    ///
    /// # Errors
    /// - `InvalidConfiguration` / `InvalidFeePercent` for a bad config
    /// - `ZeroAddress` if `admin` or `address` is null
    pub fn new(
        config: TokenConfig,
        address: Address,
        admin: Address,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        if address.is_zero() {
            return Err(VotetokenError::ZeroAddress { role: "token" });
        }
        if admin.is_zero() {
            return Err(VotetokenError::ZeroAddress { role: "admin" });
        }

        let mut ledger = Ledger::new();
        let genesis = ledger.mint(admin, config.total_supply)?;
        let mut events = EventLog::new(address);
        events.emit(clock.now(), genesis);

        tracing::info!(
            token = %address,
            admin = %admin,
            symbol = %config.symbol,
            supply = config.total_supply,
            voting_secs = config.voting_duration_secs,
            "Token created"
        );

        Ok(Self {
            address,
            admin,
            name: config.name,
            symbol: config.symbol,
            decimals: config.decimals,
            guard: ReentrancyGuard::new(),
            state: Mutex::new(TokenState {
                ledger,
                vote: PriceVote::new(
                    config.voting_duration_secs,
                    config.initial_price,
                    config.min_vote_balance_bps,
                ),
                market: Market::new(config.buy_fee_percent, config.sell_fee_percent)?,
                events,
            }),
            clock,
        })
    }

    fn state(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn only_admin(&self, caller: Address) -> Result<()> {
        if caller != self.admin {
            tracing::warn!(caller = %caller, "Admin operation rejected");
            return Err(VotetokenError::NotAdmin(caller));
        }
        Ok(())
    }

    // ----------------------------------------------------------------
    // Metadata
    // ----------------------------------------------------------------

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn admin(&self) -> Address {
        self.admin
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    // ----------------------------------------------------------------
    // Ledger
    // ----------------------------------------------------------------

    #[must_use]
    pub fn total_supply(&self) -> Amount {
        self.state().ledger.total_supply()
    }

    #[must_use]
    pub fn balance_of(&self, addr: Address) -> Amount {
        self.state().ledger.balance_of(addr)
    }

    #[must_use]
    pub fn allowance(&self, owner: Address, spender: Address) -> Amount {
        self.state().ledger.allowance(owner, spender)
    }

    /// Balance not pledged to the open vote.
    #[must_use]
    pub fn free_balance(&self, addr: Address) -> Amount {
        self.state().ledger.free_balance(addr)
    }

    #[must_use]
    pub fn locked_balance(&self, addr: Address) -> Amount {
        self.state().ledger.locked_balance(addr)
    }

    pub fn transfer(&self, caller: Address, to: Address, amount: Amount) -> Result<()> {
        let _entered = self.guard.enter("transfer")?;
        let mut state = self.state();
        let event = state.ledger.transfer(caller, to, amount)?;
        tracing::debug!(from = %caller, to = %to, amount, "Transfer");
        state.events.emit(self.clock.now(), event);
        Ok(())
    }

    pub fn approve(&self, caller: Address, spender: Address, amount: Amount) -> Result<()> {
        let _entered = self.guard.enter("approve")?;
        let mut state = self.state();
        let event = state.ledger.approve(caller, spender, amount)?;
        tracing::debug!(owner = %caller, spender = %spender, amount, "Approval");
        state.events.emit(self.clock.now(), event);
        Ok(())
    }

    pub fn transfer_from(
        &self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        let _entered = self.guard.enter("transfer_from")?;
        let mut state = self.state();
        let event = state.ledger.transfer_from(caller, from, to, amount)?;
        tracing::debug!(spender = %caller, from = %from, to = %to, amount, "Transfer on behalf");
        state.events.emit(self.clock.now(), event);
        Ok(())
    }

    /// Recompute Σ balances and compare with total supply.
    pub fn verify_supply_conservation(&self) -> Result<()> {
        self.state().ledger.verify_supply_conservation()
    }

    // ----------------------------------------------------------------
    // Price vote
    // ----------------------------------------------------------------

    /// Reference price used by the market.
    #[must_use]
    pub fn default_price(&self) -> Amount {
        self.state().vote.reference_price()
    }

    #[must_use]
    pub fn voting_duration(&self) -> u64 {
        self.state().vote.voting_duration()
    }

    /// Snapshot of the latest round, open or finalized.
    #[must_use]
    pub fn current_round(&self) -> Option<RoundSummary> {
        self.state().vote.summary()
    }

    pub fn initiate_vote(&self, caller: Address, price: Amount) -> Result<()> {
        let _entered = self.guard.enter("initiate_vote")?;
        let now = self.clock.now();
        let mut state = self.state();
        let TokenState { ledger, vote, .. } = &mut *state;
        let event = vote.initiate(ledger, caller, price, now)?;
        tracing::info!(initiator = %caller, price, at = now, "Vote initiated");
        state.events.emit(now, event);
        Ok(())
    }

    pub fn vote(&self, caller: Address, price: Amount) -> Result<()> {
        let _entered = self.guard.enter("vote")?;
        let now = self.clock.now();
        let mut state = self.state();
        let TokenState { ledger, vote, .. } = &mut *state;
        let event = vote.vote(ledger, caller, price, now)?;
        tracing::info!(voter = %caller, price, "Vote cast");
        state.events.emit(now, event);
        Ok(())
    }

    /// Close the round; any caller may trigger it once the window has ended.
    pub fn finalize_vote(&self, caller: Address) -> Result<Amount> {
        let _entered = self.guard.enter("finalize_vote")?;
        let now = self.clock.now();
        let mut state = self.state();
        let TokenState { ledger, vote, .. } = &mut *state;
        let event = vote.finalize(ledger, now)?;
        let price = vote.reference_price();
        tracing::info!(by = %caller, winning_price = price, "Vote finalized");
        state.events.emit(now, event);
        Ok(price)
    }

    // ----------------------------------------------------------------
    // Market
    // ----------------------------------------------------------------

    #[must_use]
    pub fn reserve(&self) -> Amount {
        self.state().market.reserve()
    }

    #[must_use]
    pub fn buy_fee_percent(&self) -> u8 {
        self.state().market.buy_fee_percent()
    }

    #[must_use]
    pub fn sell_fee_percent(&self) -> u8 {
        self.state().market.sell_fee_percent()
    }

    /// Swap `value` native units (already received from `caller`) for
    /// newly minted tokens. Returns the tokens credited.
    ///
    /// # Errors
    /// - `ZeroPayment` if `value == 0`
    /// - `ZeroAddress` for a null caller
    /// - `ArithmeticOverflow` if supply or reserve would overflow
    pub fn buy(&self, caller: Address, value: Amount) -> Result<Amount> {
        let _entered = self.guard.enter("buy")?;
        let now = self.clock.now();
        let mut state = self.state();
        let quote = state
            .market
            .quote_buy(value, state.vote.reference_price())?;
        let minted = state.ledger.mint(caller, quote.tokens_out)?;
        // quote_buy proved the reserve cannot overflow.
        state.market.credit_reserve(value)?;

        state.events.emit(now, minted);
        state.events.emit(
            now,
            Event::TokensPurchased {
                buyer: caller,
                value,
                fee: quote.fee,
                tokens: quote.tokens_out,
            },
        );
        tracing::info!(
            buyer = %caller,
            value,
            fee = quote.fee,
            tokens = quote.tokens_out,
            "Tokens purchased"
        );
        Ok(quote.tokens_out)
    }

    /// Burn `amount` of the caller's free tokens and pay the native
    /// proceeds to `recipient`. Returns the payout.
    ///
    /// Balances and reserve are fully updated before `recipient` runs; the
    /// guard stays held during the payment, so any re-entry is rejected. If
    /// the recipient fails or panics, the burn and reserve debit are undone.
    ///
    /// # Errors
    /// - `InsufficientBalance` if `amount` exceeds the free balance
    /// - `InsufficientReserve` if the reserve cannot cover the payout
    /// - `PaymentFailed` if the recipient rejected the payment or panicked
    pub fn sell(
        &self,
        caller: Address,
        amount: Amount,
        recipient: &mut dyn NativeRecipient,
    ) -> Result<Amount> {
        let _entered = self.guard.enter("sell")?;
        let now = self.clock.now();

        let (quote, burned) = {
            let mut state = self.state();
            if caller.is_zero() {
                return Err(VotetokenError::ZeroAddress { role: "sender" });
            }
            let available = state.ledger.free_balance(caller);
            if available < amount {
                return Err(VotetokenError::InsufficientBalance {
                    needed: amount,
                    available,
                });
            }
            let quote = state
                .market
                .quote_sell(amount, state.vote.reference_price())?;
            // Both checked above: free balance and reserve coverage.
            state.market.debit_reserve(quote.payout)?;
            let burned = state.ledger.burn(caller, amount)?;
            (quote, burned)
        };

        if quote.payout > 0 {
            let paid = panic::catch_unwind(AssertUnwindSafe(|| {
                recipient.receive_native(self, quote.payout)
            }));
            let failure = match paid {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err.to_string()),
                Err(_) => Some("recipient panicked".to_string()),
            };
            if let Some(reason) = failure {
                let mut state = self.state();
                // Exact inverse of the two writes above; neither can overflow.
                state.market.credit_reserve(quote.payout)?;
                state.ledger.mint(caller, amount)?;
                tracing::warn!(
                    seller = %caller,
                    payout = quote.payout,
                    error = %reason,
                    "Sell payment failed, rolled back"
                );
                return Err(VotetokenError::PaymentFailed { reason });
            }
        }

        let mut state = self.state();
        state.events.emit(now, burned);
        state.events.emit(
            now,
            Event::TokensSold {
                seller: caller,
                tokens: amount,
                fee: quote.fee,
                payout: quote.payout,
            },
        );
        tracing::info!(
            seller = %caller,
            tokens = amount,
            fee = quote.fee,
            payout = quote.payout,
            reserve = state.market.reserve(),
            "Tokens sold"
        );
        Ok(quote.payout)
    }

    /// Add native currency to the reserve (anyone may fund it).
    pub fn deposit_reserve(&self, caller: Address, value: Amount) -> Result<()> {
        let _entered = self.guard.enter("deposit_reserve")?;
        if value == 0 {
            return Err(VotetokenError::ZeroPayment);
        }
        let mut state = self.state();
        state.market.credit_reserve(value)?;
        state.events.emit(
            self.clock.now(),
            Event::ReserveDeposited {
                from: caller,
                value,
            },
        );
        tracing::info!(from = %caller, value, reserve = state.market.reserve(), "Reserve funded");
        Ok(())
    }

    // ----------------------------------------------------------------
    // Admin
    // ----------------------------------------------------------------

    pub fn set_buy_fee_percent(&self, caller: Address, percent: u8) -> Result<()> {
        let _entered = self.guard.enter("set_buy_fee_percent")?;
        self.only_admin(caller)?;
        let mut state = self.state();
        state.market.set_buy_fee_percent(percent)?;
        state.events.emit(
            self.clock.now(),
            Event::FeeUpdated {
                kind: FeeKind::Buy,
                percent,
            },
        );
        tracing::info!(percent, "Buy fee updated");
        Ok(())
    }

    pub fn set_sell_fee_percent(&self, caller: Address, percent: u8) -> Result<()> {
        let _entered = self.guard.enter("set_sell_fee_percent")?;
        self.only_admin(caller)?;
        let mut state = self.state();
        state.market.set_sell_fee_percent(percent)?;
        state.events.emit(
            self.clock.now(),
            Event::FeeUpdated {
                kind: FeeKind::Sell,
                percent,
            },
        );
        tracing::info!(percent, "Sell fee updated");
        Ok(())
    }

    /// Change the voting window for rounds opened after this call.
    pub fn set_voting_duration(&self, caller: Address, secs: u64) -> Result<()> {
        let _entered = self.guard.enter("set_voting_duration")?;
        self.only_admin(caller)?;
        let mut state = self.state();
        state.vote.set_voting_duration(secs)?;
        state
            .events
            .emit(self.clock.now(), Event::VotingDurationUpdated { secs });
        tracing::info!(secs, "Voting duration updated");
        Ok(())
    }

    // ----------------------------------------------------------------
    // Events
    // ----------------------------------------------------------------

    /// Every event emitted so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<EventRecord> {
        self.state().events.records().to_vec()
    }

    /// Events with sequence number `>= from`.
    #[must_use]
    pub fn events_since(&self, from: u64) -> Vec<EventRecord> {
        self.state().events.since(from).to_vec()
    }

    /// Most recent event, if any.
    #[must_use]
    pub fn last_event(&self) -> Option<Event> {
        self.state().events.last().map(|r| r.event.clone())
    }
}
