//! Claims authorized one by one with an ed25519 signature.
//!
//! The authorizer signs
//!
//! ```text
//! SHA-256(CLAIM_MESSAGE_TAG ‖ recipient[20] ‖ amount u256 BE[32] ‖ nonce u64 BE ‖ contract[20])
//! ```
//!
//! off-band and hands the signature to the recipient, who submits it with
//! the same amount and nonce. Binding the contract address stops a
//! signature from being replayed against another vesting instance.

use std::sync::Arc;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};
use votetoken_ledger::TradableToken;
use votetoken_types::{
    Address, Amount, Clock, Event, EventLog, EventRecord, Result, VotetokenError, constants,
};

use crate::{merkle::Hash32, nonce::NonceRegistry, pool::VestingPool};

/// Digest the authorizer signs for one claim.
#[must_use]
pub fn claim_message(contract: Address, recipient: Address, amount: Amount, nonce: u64) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(constants::CLAIM_MESSAGE_TAG);
    hasher.update(recipient.as_bytes());
    hasher.update([0u8; 16]);
    hasher.update(amount.to_be_bytes());
    hasher.update(nonce.to_be_bytes());
    hasher.update(contract.as_bytes());
    hasher.finalize().into()
}

/// Sign a claim the way the authorizer does.
#[must_use]
pub fn sign_claim(
    key: &SigningKey,
    contract: Address,
    recipient: Address,
    amount: Amount,
    nonce: u64,
) -> Signature {
    key.sign(&claim_message(contract, recipient, amount, nonce))
}

/// Signature-claim vesting contract.
pub struct SignatureVesting {
    admin: Address,
    authorizer: VerifyingKey,
    pool: VestingPool,
    clock: Arc<dyn Clock>,
    nonces: NonceRegistry,
    events: EventLog,
}

impl SignatureVesting {
    pub fn new(
        address: Address,
        admin: Address,
        authorizer: VerifyingKey,
        token: Arc<TradableToken>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if admin.is_zero() {
            return Err(VotetokenError::ZeroAddress { role: "admin" });
        }
        Ok(Self {
            admin,
            authorizer,
            pool: VestingPool::new(address, token)?,
            clock,
            nonces: NonceRegistry::new(),
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
    pub fn authorizer(&self) -> VerifyingKey {
        self.authorizer
    }

    /// Ledger identity of the current authorizer key.
    #[must_use]
    pub fn authorizer_address(&self) -> Address {
        Address::from_verifying_key(&self.authorizer)
    }

    #[must_use]
    pub fn pool_balance(&self) -> Amount {
        self.pool.balance()
    }

    #[must_use]
    pub fn is_nonce_used(&self, recipient: Address, nonce: u64) -> bool {
        self.nonces.is_used(recipient, nonce)
    }

    /// Rotate the signing authority.
    pub fn set_authorizer(&mut self, caller: Address, authorizer: VerifyingKey) -> Result<()> {
        if caller != self.admin {
            tracing::warn!(caller = %caller, "Authorizer rotation rejected: not admin");
            return Err(VotetokenError::NotAdmin(caller));
        }
        self.authorizer = authorizer;
        self.events.emit(
            self.clock.now(),
            Event::AuthorizerUpdated {
                authorizer: authorizer.to_bytes(),
            },
        );
        tracing::info!(authorizer = %self.authorizer_address(), "Authorizer updated");
        Ok(())
    }

    /// Pay `amount` to `caller` under an authorizer signature.
    ///
    /// # Errors
    /// - `InvalidSignature` unless the authorizer signed exactly this claim
    /// - `NonceAlreadyUsed` if `(caller, nonce)` was consumed
    /// - the token's errors if the pool cannot pay
    pub fn claim_tokens(
        &mut self,
        caller: Address,
        amount: Amount,
        nonce: u64,
        signature: &Signature,
    ) -> Result<()> {
        let message = claim_message(self.address(), caller, amount, nonce);
        if self.authorizer.verify_strict(&message, signature).is_err() {
            tracing::warn!(
                recipient = %caller,
                amount,
                nonce,
                authorizer = %self.authorizer_address(),
                "Claim with invalid signature"
            );
            return Err(VotetokenError::InvalidSignature);
        }
        if self.nonces.is_used(caller, nonce) {
            tracing::warn!(recipient = %caller, nonce, "Claim nonce replayed");
            return Err(VotetokenError::NonceAlreadyUsed {
                recipient: caller,
                nonce,
            });
        }

        self.pool.release(caller, amount)?;
        self.nonces.consume(caller, nonce)?;
        self.events.emit(
            self.clock.now(),
            Event::TokensClaimed {
                recipient: caller,
                amount,
            },
        );
        tracing::info!(recipient = %caller, amount, nonce, "Signed claim paid");
        Ok(())
    }

    #[must_use]
    pub fn events(&self) -> &[EventRecord] {
        self.events.records()
    }
}
