//! Balance and allowance bookkeeping.
//!
//! Tracks per-address balances, per-(owner, spender) allowances and the
//! vote-lock markers that reduce an address's *free* balance while it
//! participates in an open price-vote round. All mutations are atomic:
//! every check runs before the first write, so a failed call leaves the
//! ledger unchanged.
//!
//! Locks are tagged with the round they were taken in and only count while
//! that round is the ledger's `lock_round`. Closing the round therefore
//! releases every lock at once.

use std::collections::HashMap;

use votetoken_types::{Address, Amount, Event, Result, RoundId, VotetokenError};

/// Balance pledged to a vote round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VoteLock {
    round: RoundId,
    amount: Amount,
}

/// Source of truth for token balances.
#[derive(Debug, Default)]
pub struct Ledger {
    /// Per-address balances. Missing means zero.
    balances: HashMap<Address, Amount>,
    /// Remaining spendable amount per (owner, spender).
    allowances: HashMap<(Address, Address), Amount>,
    /// Per-address lock markers.
    locks: HashMap<Address, VoteLock>,
    /// Round whose locks are currently in force.
    lock_round: Option<RoundId>,
    /// Σ balances.
    total_supply: Amount,
}

fn non_zero(addr: Address, role: &'static str) -> Result<()> {
    if addr.is_zero() {
        return Err(VotetokenError::ZeroAddress { role });
    }
    Ok(())
}

impl Ledger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `addr` (locked or not).
    #[must_use]
    pub fn balance_of(&self, addr: Address) -> Amount {
        self.balances.get(&addr).copied().unwrap_or(0)
    }

    /// Remaining allowance `owner` granted to `spender`.
    #[must_use]
    pub fn allowance(&self, owner: Address, spender: Address) -> Amount {
        self.allowances.get(&(owner, spender)).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Amount currently locked by the open round.
    #[must_use]
    pub fn locked_balance(&self, addr: Address) -> Amount {
        match (self.locks.get(&addr), self.lock_round) {
            (Some(lock), Some(round)) if lock.round == round => lock.amount,
            _ => 0,
        }
    }

    /// Transferable balance: total minus the active lock.
    #[must_use]
    pub fn free_balance(&self, addr: Address) -> Amount {
        self.balance_of(addr)
            .saturating_sub(self.locked_balance(addr))
    }

    fn ensure_free(&self, addr: Address, amount: Amount) -> Result<()> {
        let available = self.free_balance(addr);
        if available < amount {
            return Err(VotetokenError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        Ok(())
    }

    /// Move `amount` from `from` to `to`.
    ///
    /// # Errors
    /// - `ZeroAddress` if either side is null
    /// - `InsufficientBalance` if `amount` exceeds `from`'s free balance
    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<Event> {
        non_zero(from, "sender")?;
        non_zero(to, "recipient")?;
        self.ensure_free(from, amount)?;
        self.move_unchecked(from, to, amount);
        Ok(Event::Transfer { from, to, amount })
    }

    /// Set the allowance of `spender` over `owner`'s tokens to `amount`.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: Amount) -> Result<Event> {
        non_zero(owner, "owner")?;
        non_zero(spender, "spender")?;
        self.allowances.insert((owner, spender), amount);
        Ok(Event::Approval {
            owner,
            spender,
            amount,
        })
    }

    /// Spend `amount` of `from`'s tokens on its behalf.
    ///
    /// Checks run in order: zero address, allowance, free balance.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<Event> {
        non_zero(spender, "spender")?;
        non_zero(from, "sender")?;
        non_zero(to, "recipient")?;
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(VotetokenError::InsufficientAllowance {
                needed: amount,
                allowed,
            });
        }
        self.ensure_free(from, amount)?;

        self.allowances.insert((from, spender), allowed - amount);
        self.move_unchecked(from, to, amount);
        Ok(Event::Transfer { from, to, amount })
    }

    /// Create `amount` new tokens for `to`.
    ///
    /// # Errors
    /// `ArithmeticOverflow` if total supply would exceed `u128::MAX`.
    pub fn mint(&mut self, to: Address, amount: Amount) -> Result<Event> {
        non_zero(to, "recipient")?;
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(VotetokenError::ArithmeticOverflow { context: "mint" })?;
        self.total_supply = supply;
        // Σ balances == supply, so no single balance can overflow here.
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(Event::Transfer {
            from: Address::ZERO,
            to,
            amount,
        })
    }

    /// Destroy `amount` of `from`'s free tokens.
    pub fn burn(&mut self, from: Address, amount: Amount) -> Result<Event> {
        non_zero(from, "sender")?;
        self.ensure_free(from, amount)?;
        self.debit(from, amount);
        self.total_supply -= amount;
        Ok(Event::Transfer {
            from,
            to: Address::ZERO,
            amount,
        })
    }

    /// Pledge `amount` of `addr`'s balance to `round`.
    pub fn lock(&mut self, addr: Address, round: RoundId, amount: Amount) {
        self.locks.insert(addr, VoteLock { round, amount });
    }

    /// Put the locks of `round` in force.
    pub fn open_lock_round(&mut self, round: RoundId) {
        self.lock_round = Some(round);
        self.locks.retain(|_, lock| lock.round == round);
    }

    /// Release every lock of the current round. O(1): stale markers are
    /// dropped lazily when the next round opens.
    pub fn release_locks(&mut self) {
        self.lock_round = None;
    }

    /// Recompute Σ balances and compare against the tracked supply.
    ///
    /// # Errors
    /// `SupplyInvariantViolation` on mismatch.
    pub fn verify_supply_conservation(&self) -> Result<()> {
        let sum = self
            .balances
            .values()
            .try_fold(0u128, |acc, b| acc.checked_add(*b));
        match sum {
            Some(sum) if sum == self.total_supply => Ok(()),
            Some(sum) => Err(VotetokenError::SupplyInvariantViolation {
                reason: format!("sum of balances {sum} != total supply {}", self.total_supply),
            }),
            None => Err(VotetokenError::SupplyInvariantViolation {
                reason: "sum of balances overflows".into(),
            }),
        }
    }

    fn move_unchecked(&mut self, from: Address, to: Address, amount: Amount) {
        if from == to || amount == 0 {
            return;
        }
        self.debit(from, amount);
        *self.balances.entry(to).or_insert(0) += amount;
    }

    fn debit(&mut self, from: Address, amount: Amount) {
        if let Some(balance) = self.balances.get_mut(&from) {
            *balance -= amount;
            if *balance == 0 {
                self.balances.remove(&from);
            }
        }
    }
}
