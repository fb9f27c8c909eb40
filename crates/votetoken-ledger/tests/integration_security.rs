//! # Security Integration Tests
//!
//! An attacker that has read the source tries to exploit the one point
//! where foreign code runs inside a token call: the `sell` payout. Every
//! test proves the attempt fails and the books still balance.
//!
//! | Attack                       | Defence                                   |
//! |------------------------------|-------------------------------------------|
//! | Re-enter `sell` to drain     | Guard held across the payout              |
//! | Re-enter any other mutator   | One guard for every state-mutating call   |
//! | Refuse payment after burn    | Rollback of burn and reserve debit        |
//! | Sell pledged vote balance    | Sells spend only the free balance         |
//! | Panic inside the payout      | Unwind caught, same rollback as a refusal |
//! | Flood from many threads      | Other threads wait, nothing is rejected   |

use std::{sync::Arc, thread};

use votetoken_ledger::{NativeRecipient, NativeWallet, TradableToken};
use votetoken_types::{
    Address, Amount, Event, ManualClock, Result, TokenConfig, VotetokenError,
};

const SUPPLY: Amount = 1_000_000;
const RESERVE: Amount = 100_000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn addr(label: &str) -> Address {
    Address::from_label(label)
}

/// Token with a funded reserve and `attacker` holding `stake`.
fn setup(attacker: Address, stake: Amount) -> TradableToken {
    init_tracing();
    let clock = Arc::new(ManualClock::new(1_000));
    let config = TokenConfig::new("MyToken", "MTN", 18, SUPPLY, 3_600);
    let token = TradableToken::new(config, addr("token"), addr("owner"), clock).unwrap();
    token.deposit_reserve(addr("owner"), RESERVE).unwrap();
    token.transfer(addr("owner"), attacker, stake).unwrap();
    token
}

/// Payout receiver that calls `sell` again from inside the payment.
struct ReentrantSeller {
    me: Address,
    amount: Amount,
    /// Forward the nested failure to the outer call.
    propagate: bool,
    received: Amount,
    balance_seen: Option<Amount>,
    reserve_seen: Option<Amount>,
    nested: Vec<Result<Amount>>,
}

impl ReentrantSeller {
    fn new(me: Address, amount: Amount, propagate: bool) -> Self {
        Self {
            me,
            amount,
            propagate,
            received: 0,
            balance_seen: None,
            reserve_seen: None,
            nested: Vec::new(),
        }
    }
}

impl NativeRecipient for ReentrantSeller {
    fn receive_native(&mut self, token: &TradableToken, amount: Amount) -> Result<()> {
        self.balance_seen = Some(token.balance_of(self.me));
        self.reserve_seen = Some(token.reserve());
        let mut sink = NativeWallet::new();
        let nested = token.sell(self.me, self.amount, &mut sink);
        self.nested.push(nested.clone());
        if self.propagate {
            nested?;
        }
        self.received += amount;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════
// TEST 1: Nested sell is rejected, outer sell completes once
// ═══════════════════════════════════════════════════════════════════

#[test]
fn reentrant_sell_cannot_drain_reserve() {
    let attacker = addr("attacker");
    let token = setup(attacker, 2_000);
    let mut contract = ReentrantSeller::new(attacker, 1_000, false);

    let payout = token.sell(attacker, 1_000, &mut contract).unwrap();
    assert_eq!(payout, 980);

    assert_eq!(contract.nested.len(), 1);
    assert_eq!(
        contract.nested[0],
        Err(VotetokenError::ReentrantCall { operation: "sell" })
    );
    assert_eq!(contract.received, 980);
    assert_eq!(token.balance_of(attacker), 1_000);
    assert_eq!(token.reserve(), RESERVE - 980);
    token.verify_supply_conservation().unwrap();
}

// ═══════════════════════════════════════════════════════════════════
// TEST 2: State is committed before the payment runs
// ═══════════════════════════════════════════════════════════════════

#[test]
fn payout_observes_committed_state() {
    let attacker = addr("attacker");
    let token = setup(attacker, 2_000);
    let mut contract = ReentrantSeller::new(attacker, 1, false);

    token.sell(attacker, 500, &mut contract).unwrap();
    assert_eq!(contract.balance_seen, Some(1_500));
    assert_eq!(contract.reserve_seen, Some(RESERVE - 490));
}

// ═══════════════════════════════════════════════════════════════════
// TEST 3: Propagated failure rolls the whole sell back
// ═══════════════════════════════════════════════════════════════════

#[test]
fn failed_payment_rolls_back() {
    let attacker = addr("attacker");
    let token = setup(attacker, 2_000);
    let events_before = token.events().len();
    let supply_before = token.total_supply();
    let mut contract = ReentrantSeller::new(attacker, 1_000, true);

    let err = token.sell(attacker, 1_000, &mut contract).unwrap_err();
    assert_eq!(err.reason(), "PaymentFailed");
    assert!(err.to_string().contains("ReentrantCall"));

    assert_eq!(contract.received, 0);
    assert_eq!(token.balance_of(attacker), 2_000);
    assert_eq!(token.reserve(), RESERVE);
    assert_eq!(token.total_supply(), supply_before);
    assert_eq!(token.events().len(), events_before);
    token.verify_supply_conservation().unwrap();

    // Guard released: a plain sell goes through afterwards.
    let mut wallet = NativeWallet::new();
    assert_eq!(token.sell(attacker, 1_000, &mut wallet).unwrap(), 980);
}

// ═══════════════════════════════════════════════════════════════════
// TEST 4: Every mutating entry point is guarded
// ═══════════════════════════════════════════════════════════════════

/// Tries each mutator once from inside the payout.
struct MutatorSweep {
    me: Address,
    outcomes: Vec<Result<()>>,
}

impl NativeRecipient for MutatorSweep {
    fn receive_native(&mut self, token: &TradableToken, _amount: Amount) -> Result<()> {
        let owner = addr("owner");
        self.outcomes = vec![
            token.transfer(self.me, owner, 1),
            token.approve(self.me, owner, 1),
            token.transfer_from(self.me, owner, self.me, 1),
            token.initiate_vote(self.me, 9),
            token.vote(self.me, 9),
            token.finalize_vote(self.me).map(|_| ()),
            token.buy(self.me, 1).map(|_| ()),
            token.deposit_reserve(self.me, 1),
            token.set_buy_fee_percent(owner, 1),
        ];
        Ok(())
    }
}

#[test]
fn all_mutators_rejected_during_payout() {
    let attacker = addr("attacker");
    let token = setup(attacker, 2_000);
    let mut sweep = MutatorSweep {
        me: attacker,
        outcomes: Vec::new(),
    };
    token.sell(attacker, 100, &mut sweep).unwrap();

    assert_eq!(sweep.outcomes.len(), 9);
    for outcome in &sweep.outcomes {
        assert_eq!(outcome.as_ref().unwrap_err().reason(), "ReentrantCall");
    }
    assert!(token.current_round().is_none());
    assert_eq!(token.buy_fee_percent(), 2);
}

// ═══════════════════════════════════════════════════════════════════
// TEST 5: Pledged balance is not sellable
// ═══════════════════════════════════════════════════════════════════

#[test]
fn vote_locked_tokens_cannot_be_sold() {
    let attacker = addr("attacker");
    let token = setup(attacker, 2_000);
    token.initiate_vote(attacker, 5).unwrap();

    let mut wallet = NativeWallet::new();
    let err = token.sell(attacker, 2_000, &mut wallet).unwrap_err();
    assert_eq!(
        err,
        VotetokenError::InsufficientBalance {
            needed: 2_000,
            available: 0
        }
    );
    assert_eq!(token.reserve(), RESERVE);
}

#[test]
fn zero_payout_skips_recipient() {
    let attacker = addr("attacker");
    let token = setup(attacker, 2_000);
    let mut contract = ReentrantSeller::new(attacker, 1, true);

    // 100% fee leaves nothing to pay out.
    token.set_sell_fee_percent(addr("owner"), 100).unwrap();
    assert_eq!(token.sell(attacker, 10, &mut contract).unwrap(), 0);
    assert!(contract.nested.is_empty());
    assert_eq!(token.balance_of(attacker), 1_990);
    assert!(matches!(
        token.last_event(),
        Some(Event::TokensSold { payout: 0, fee: 10, .. })
    ));
}

// ═══════════════════════════════════════════════════════════════════
// TEST 6: A panicking recipient is rolled back like a refusal
// ═══════════════════════════════════════════════════════════════════

struct PanickingRecipient;

impl NativeRecipient for PanickingRecipient {
    fn receive_native(&mut self, _token: &TradableToken, _amount: Amount) -> Result<()> {
        panic!("recipient blew up");
    }
}

#[test]
fn panicking_payment_rolls_back() {
    let seller = addr("seller");
    let token = setup(seller, 1_000);
    let events_before = token.events().len();
    let supply_before = token.total_supply();

    let err = token.sell(seller, 1_000, &mut PanickingRecipient).unwrap_err();
    assert_eq!(err.reason(), "PaymentFailed");
    assert!(err.to_string().contains("recipient panicked"));

    assert_eq!(token.balance_of(seller), 1_000);
    assert_eq!(token.reserve(), RESERVE);
    assert_eq!(token.total_supply(), supply_before);
    assert_eq!(token.events().len(), events_before);
    token.verify_supply_conservation().unwrap();

    let mut wallet = NativeWallet::new();
    assert_eq!(token.sell(seller, 1_000, &mut wallet).unwrap(), 980);
    assert_eq!(wallet.balance(), 980);
}

// ═══════════════════════════════════════════════════════════════════
// TEST 7: Concurrent callers wait, none is rejected
// ═══════════════════════════════════════════════════════════════════

#[test]
fn concurrent_transfers_all_succeed() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 20_000;

    let owner = addr("owner");
    let token = setup(addr("idle"), 0);
    let events_before = token.events().len();
    let holders: Vec<Address> = (0..THREADS)
        .map(|i| addr(&format!("holder-{i}")))
        .collect();

    let rejected: usize = thread::scope(|s| {
        let workers: Vec<_> = holders
            .iter()
            .map(|&holder| {
                let token = &token;
                s.spawn(move || {
                    (0..PER_THREAD)
                        .filter(|_| token.transfer(owner, holder, 1).is_err())
                        .count()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).sum()
    });

    assert_eq!(rejected, 0);
    for holder in &holders {
        assert_eq!(token.balance_of(*holder), PER_THREAD as Amount);
    }
    assert_eq!(
        token.balance_of(owner),
        SUPPLY - (THREADS * PER_THREAD) as Amount
    );
    assert_eq!(token.events().len(), events_before + THREADS * PER_THREAD);
    token.verify_supply_conservation().unwrap();
}
