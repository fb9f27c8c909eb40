//! Outbound native-currency payments.
//!
//! A `sell` pays its seller through a [`NativeRecipient`] *after* every
//! internal update has been committed. The recipient is handed the token
//! instance itself, so arbitrary (possibly hostile) code may run here and
//! try to call back into the token; the reentrancy guard rejects any such
//! state-mutating call.

use votetoken_types::{Amount, Result, VotetokenError};

use crate::token::TradableToken;

/// Receiver of native-currency payouts.
pub trait NativeRecipient {
    /// Accept `amount` native units paid by `token`.
    ///
    /// Returning an error or panicking aborts the payment and rolls the
    /// sell back.
    fn receive_native(&mut self, token: &TradableToken, amount: Amount) -> Result<()>;
}

/// Plain balance-holding wallet that accepts every payment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NativeWallet {
    balance: Amount,
}

impl NativeWallet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn balance(&self) -> Amount {
        self.balance
    }
}

impl NativeRecipient for NativeWallet {
    fn receive_native(&mut self, _token: &TradableToken, amount: Amount) -> Result<()> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(VotetokenError::ArithmeticOverflow { context: "wallet balance" })?;
        Ok(())
    }
}
