//! Direct allocations released after a fixed cliff.
//!
//! The admin writes one [`VestingEntry`] per recipient. Once the cliff has
//! passed the recipient may claim any part of what remains, in as many
//! claims as they like.

use std::{collections::HashMap, sync::Arc};

use votetoken_ledger::TradableToken;
use votetoken_types::{
    Address, Amount, Clock, Event, EventLog, EventRecord, Result, VestingConfig, VotetokenError,
};

use crate::pool::VestingPool;

/// One recipient's allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VestingEntry {
    pub total_amount: Amount,
    pub claimed_amount: Amount,
    /// First second at which claims succeed.
    pub cliff_timestamp: u64,
}

impl VestingEntry {
    #[must_use]
    pub fn remaining(&self) -> Amount {
        self.total_amount.saturating_sub(self.claimed_amount)
    }
}

/// Cliff-vesting contract.
pub struct LinearVesting {
    admin: Address,
    pool: VestingPool,
    clock: Arc<dyn Clock>,
    cliff_duration: u64,
    entries: HashMap<Address, VestingEntry>,
    events: EventLog,
}

impl LinearVesting {
    pub fn new(
        config: &VestingConfig,
        address: Address,
        admin: Address,
        token: Arc<TradableToken>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if admin.is_zero() {
            return Err(VotetokenError::ZeroAddress { role: "admin" });
        }
        Ok(Self {
            admin,
            pool: VestingPool::new(address, token)?,
            clock,
            cliff_duration: config.cliff_duration_secs,
            entries: HashMap::new(),
            events: EventLog::new(address),
        })
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.pool.address()
    }

    #[must_use]
    pub fn admin(&self) -> Address {
        self.admin
    }

    #[must_use]
    pub fn pool_balance(&self) -> Amount {
        self.pool.balance()
    }

    #[must_use]
    pub fn vesting_info(&self, recipient: Address) -> Option<VestingEntry> {
        self.entries.get(&recipient).copied()
    }

    /// Create or overwrite entries with `cliff = now + cliff duration`.
    ///
    /// The whole batch is validated before any entry is written.
    ///
    /// # Errors
    /// - `NotAdmin` for any caller but the admin
    /// - `LengthMismatch` if the slices differ in length
    /// - `ZeroAddress` if any recipient is null
    pub fn allocate_many(
        &mut self,
        caller: Address,
        recipients: &[Address],
        amounts: &[Amount],
    ) -> Result<()> {
        if caller != self.admin {
            tracing::warn!(caller = %caller, "Allocation rejected: not admin");
            return Err(VotetokenError::NotAdmin(caller));
        }
        if recipients.len() != amounts.len() {
            return Err(VotetokenError::LengthMismatch {
                left: recipients.len(),
                right: amounts.len(),
            });
        }
        if recipients.iter().any(Address::is_zero) {
            return Err(VotetokenError::ZeroAddress { role: "recipient" });
        }
        let now = self.clock.now();
        let cliff = now
            .checked_add(self.cliff_duration)
            .ok_or(VotetokenError::ArithmeticOverflow { context: "cliff timestamp" })?;

        for (&recipient, &amount) in recipients.iter().zip(amounts) {
            self.entries.insert(
                recipient,
                VestingEntry {
                    total_amount: amount,
                    claimed_amount: 0,
                    cliff_timestamp: cliff,
                },
            );
            self.events.emit(
                now,
                Event::VestingAllocated {
                    recipient,
                    amount,
                    cliff,
                },
            );
        }
        tracing::info!(count = recipients.len(), cliff, "Vesting allocated");
        Ok(())
    }

    /// Release `amount` of the caller's allocation.
    ///
    /// # Errors
    /// - `CliffNotPassed` before the cliff
    /// - `ClaimExceedsAllocation` past the allocation, or with no entry
    /// - the token's `InsufficientBalance` if the pool is short
    pub fn claim_tokens(&mut self, caller: Address, amount: Amount) -> Result<()> {
        let now = self.clock.now();
        let Some(entry) = self.entries.get(&caller).copied() else {
            return Err(VotetokenError::ClaimExceedsAllocation {
                claimed: 0,
                requested: amount,
                allocated: 0,
            });
        };
        if now < entry.cliff_timestamp {
            return Err(VotetokenError::CliffNotPassed {
                cliff: entry.cliff_timestamp,
                now,
            });
        }
        let claimed = entry
            .claimed_amount
            .checked_add(amount)
            .filter(|&total| total <= entry.total_amount)
            .ok_or(VotetokenError::ClaimExceedsAllocation {
                claimed: entry.claimed_amount,
                requested: amount,
                allocated: entry.total_amount,
            })?;

        self.pool.release(caller, amount)?;
        self.entries.insert(
            caller,
            VestingEntry {
                claimed_amount: claimed,
                ..entry
            },
        );
        self.events.emit(
            now,
            Event::TokensClaimed {
                recipient: caller,
                amount,
            },
        );
        tracing::info!(recipient = %caller, amount, claimed, "Linear vesting claimed");
        Ok(())
    }

    #[must_use]
    pub fn events(&self) -> &[EventRecord] {
        self.events.records()
    }
}
