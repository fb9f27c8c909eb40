//! Single-round, balance-weighted price governance.
//!
//! ## State Machine
//!
//! ```text
//!   ┌───────────────┐ initiate  ┌───────────┐ finalize  ┌───────────┐
//!   │ NoActiveRound ├──────────▶│ RoundOpen ├──────────▶│ Finalized │
//!   └───────────────┘           └─────┬─────┘           └─────┬─────┘
//!           ▲                         │ vote (until end)      │
//!           │                         ▼                       │
//!           └──────────── slot reusable after finalize ◀──────┘
//! ```
//!
//! At most one round is open. Each participant's whole free balance is
//! pledged (locked in the [`Ledger`]) and counted as weight for the price
//! they named. The leading price is maintained as votes arrive, so
//! finalization is O(1).
//!
//! Tie-break: on equal weight the price that was *first submitted* in the
//! round wins.

use std::collections::{HashMap, HashSet};

use votetoken_types::{Address, Amount, Event, Result, RoundId, VotetokenError, constants};

use crate::ledger::Ledger;

/// Accumulated weight for one proposed price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tally {
    weight: Amount,
    /// Submission index of the first vote naming this price.
    first_seen: u64,
}

/// One voting round.
#[derive(Debug, Clone)]
pub struct VoteRound {
    pub id: RoundId,
    pub proposed_price: Amount,
    pub initiator: Address,
    pub start_time: u64,
    /// Voting window captured when the round opened.
    pub duration: u64,
    pub finalized: bool,
    voters: HashSet<Address>,
    tallies: HashMap<Amount, Tally>,
    leader: Amount,
    submissions: u64,
}

impl VoteRound {
    fn open(id: RoundId, proposed_price: Amount, initiator: Address, now: u64, duration: u64) -> Self {
        Self {
            id,
            proposed_price,
            initiator,
            start_time: now,
            duration,
            finalized: false,
            voters: HashSet::new(),
            tallies: HashMap::new(),
            leader: proposed_price,
            submissions: 0,
        }
    }

    /// Last second at which votes are accepted; finalization allowed from here.
    #[must_use]
    pub fn ends_at(&self) -> u64 {
        self.start_time.saturating_add(self.duration)
    }

    #[must_use]
    pub fn has_voted(&self, voter: Address) -> bool {
        self.voters.contains(&voter)
    }

    /// Weight accumulated for `price` so far.
    #[must_use]
    pub fn weight_for(&self, price: Amount) -> Amount {
        self.tallies.get(&price).map_or(0, |t| t.weight)
    }

    #[must_use]
    pub fn leading_price(&self) -> Amount {
        self.leader
    }

    #[must_use]
    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    /// Add `weight` for `price`. Nothing changes if the sum would overflow.
    fn record(&mut self, voter: Address, price: Amount, weight: Amount) -> Result<()> {
        let seq = self.submissions;
        let (current, first_seen) = self
            .tallies
            .get(&price)
            .map_or((0, seq), |t| (t.weight, t.first_seen));
        let updated = current
            .checked_add(weight)
            .ok_or(VotetokenError::ArithmeticOverflow { context: "vote weight" })?;

        self.tallies.insert(
            price,
            Tally {
                weight: updated,
                first_seen,
            },
        );
        self.voters.insert(voter);
        self.submissions += 1;

        if price != self.leader {
            let overtakes = self.tallies.get(&self.leader).is_none_or(|lead| {
                updated > lead.weight || (updated == lead.weight && first_seen < lead.first_seen)
            });
            if overtakes {
                self.leader = price;
            }
        }
        Ok(())
    }
}

/// Read-only view of the latest round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSummary {
    pub id: RoundId,
    pub proposed_price: Amount,
    pub initiator: Address,
    pub start_time: u64,
    pub ends_at: u64,
    pub finalized: bool,
    pub leading_price: Amount,
    pub leading_weight: Amount,
    pub voter_count: usize,
}

/// Governance over the reference price.
#[derive(Debug)]
pub struct PriceVote {
    /// Latest round, open or finalized.
    round: Option<VoteRound>,
    next_round: RoundId,
    voting_duration: u64,
    reference_price: Amount,
    min_vote_balance_bps: u32,
}

impl PriceVote {
    #[must_use]
    pub fn new(voting_duration: u64, initial_price: Amount, min_vote_balance_bps: u32) -> Self {
        Self {
            round: None,
            next_round: RoundId(constants::FIRST_ROUND_ID),
            voting_duration,
            reference_price: initial_price,
            min_vote_balance_bps,
        }
    }

    /// Current reference price used by the market.
    #[must_use]
    pub fn reference_price(&self) -> Amount {
        self.reference_price
    }

    #[must_use]
    pub fn voting_duration(&self) -> u64 {
        self.voting_duration
    }

    /// Change the window for rounds opened from now on.
    pub fn set_voting_duration(&mut self, secs: u64) -> Result<()> {
        if secs == 0 {
            return Err(VotetokenError::InvalidConfiguration(
                "voting duration must be non-zero".into(),
            ));
        }
        self.voting_duration = secs;
        Ok(())
    }

    /// Minimum free balance to propose or vote, given the supply.
    #[must_use]
    pub fn threshold(&self, total_supply: Amount) -> Amount {
        let bps = u128::from(self.min_vote_balance_bps);
        total_supply.checked_mul(bps).map_or_else(
            || total_supply / constants::BPS_DENOMINATOR * bps,
            |scaled| scaled / constants::BPS_DENOMINATOR,
        )
    }

    #[must_use]
    pub fn round(&self) -> Option<&VoteRound> {
        self.round.as_ref()
    }

    /// The open round, if any.
    #[must_use]
    pub fn open_round(&self) -> Option<&VoteRound> {
        self.round.as_ref().filter(|r| !r.finalized)
    }

    #[must_use]
    pub fn summary(&self) -> Option<RoundSummary> {
        self.round.as_ref().map(|r| RoundSummary {
            id: r.id,
            proposed_price: r.proposed_price,
            initiator: r.initiator,
            start_time: r.start_time,
            ends_at: r.ends_at(),
            finalized: r.finalized,
            leading_price: r.leader,
            leading_weight: r.weight_for(r.leader),
            voter_count: r.voter_count(),
        })
    }

    fn eligible_weight(&self, ledger: &Ledger, voter: Address) -> Result<Amount> {
        let threshold = self.threshold(ledger.total_supply());
        let available = ledger.free_balance(voter);
        if available == 0 || available < threshold {
            return Err(VotetokenError::InsufficientBalance {
                needed: threshold.max(1),
                available,
            });
        }
        Ok(available)
    }

    /// Open a round proposing `price`; the initiator's vote counts at once.
    ///
    /// # Errors
    /// - `ZeroPrice` if `price == 0`
    /// - `ActiveVoteOngoing` if a round is open
    /// - `InsufficientBalance` if the caller is below the threshold
    pub fn initiate(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        price: Amount,
        now: u64,
    ) -> Result<Event> {
        if price == 0 {
            return Err(VotetokenError::ZeroPrice);
        }
        if let Some(open) = self.open_round() {
            return Err(VotetokenError::ActiveVoteOngoing(open.id));
        }
        let weight = self.eligible_weight(ledger, caller)?;

        let id = self.next_round;
        let mut round = VoteRound::open(id, price, caller, now, self.voting_duration);
        round.record(caller, price, weight)?;

        self.next_round = id.next();
        self.round = Some(round);
        ledger.open_lock_round(id);
        ledger.lock(caller, id, weight);

        Ok(Event::VoteInitiated {
            round: id,
            proposed_price: price,
            initiator: caller,
        })
    }

    /// Cast the caller's balance-weighted vote for `price`.
    ///
    /// # Errors
    /// - `ZeroPrice` if `price == 0`
    /// - `InvalidRound` if no round is open
    /// - `VotingPeriodEnded` after the window
    /// - `AlreadyVoted` on a second vote
    /// - `InsufficientBalance` below the threshold
    pub fn vote(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        price: Amount,
        now: u64,
    ) -> Result<Event> {
        if price == 0 {
            return Err(VotetokenError::ZeroPrice);
        }
        let round = self.open_round().ok_or(VotetokenError::InvalidRound)?;
        if now > round.ends_at() {
            return Err(VotetokenError::VotingPeriodEnded(round.id));
        }
        if round.has_voted(caller) {
            return Err(VotetokenError::AlreadyVoted {
                round: round.id,
                voter: caller,
            });
        }
        let weight = self.eligible_weight(ledger, caller)?;

        let round = self
            .round
            .as_mut()
            .ok_or(VotetokenError::InvalidRound)?;
        round.record(caller, price, weight)?;
        ledger.lock(caller, round.id, weight);

        Ok(Event::Voted {
            round: round.id,
            price,
            weight,
            voter: caller,
        })
    }

    /// Close the round: adopt the leading price and release every lock.
    ///
    /// # Errors
    /// - `InvalidRound` if no round was ever opened
    /// - `VotingPeriodNotEnded` before the window closes
    /// - `AlreadyFinalized` if the latest round is already closed
    pub fn finalize(&mut self, ledger: &mut Ledger, now: u64) -> Result<Event> {
        let round = self.round.as_mut().ok_or(VotetokenError::InvalidRound)?;
        if now < round.ends_at() {
            return Err(VotetokenError::VotingPeriodNotEnded {
                round: round.id,
                ends_at: round.ends_at(),
            });
        }
        if round.finalized {
            return Err(VotetokenError::AlreadyFinalized(round.id));
        }

        round.finalized = true;
        self.reference_price = round.leader;
        ledger.release_locks();

        Ok(Event::VoteFinalized {
            round: round.id,
            winning_price: round.leader,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUPPLY: Amount = 1_000_000;
    const WEEK: u64 = 604_800;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    /// Owner holds the supply; `holders` each receive their amount.
    fn setup(holders: &[(&str, Amount)]) -> (PriceVote, Ledger) {
        let owner = addr("owner");
        let mut ledger = Ledger::new();
        ledger.mint(owner, SUPPLY).unwrap();
        for (label, amount) in holders {
            ledger.transfer(owner, addr(label), *amount).unwrap();
        }
        (PriceVote::new(WEEK, 1, 5), ledger)
    }

    #[test]
    fn threshold_is_fraction_of_supply() {
        let pv = PriceVote::new(WEEK, 1, 5);
        assert_eq!(pv.threshold(1_000_000), 500);
        assert_eq!(pv.threshold(u128::MAX), u128::MAX / 10_000 * 5);
    }

    #[test]
    fn initiate_opens_round_and_locks() {
        let (mut pv, mut ledger) = setup(&[("a", 1_000)]);
        let ev = pv.initiate(&mut ledger, addr("a"), 42, 100).unwrap();
        assert_eq!(
            ev,
            Event::VoteInitiated {
                round: RoundId(1),
                proposed_price: 42,
                initiator: addr("a")
            }
        );
        assert_eq!(ledger.free_balance(addr("a")), 0);
        let summary = pv.summary().unwrap();
        assert_eq!(summary.leading_weight, 1_000);
        assert_eq!(summary.ends_at, 100 + WEEK);
    }

    #[test]
    fn initiate_below_threshold_fails() {
        let (mut pv, mut ledger) = setup(&[("a", 499)]);
        let err = pv.initiate(&mut ledger, addr("a"), 42, 0).unwrap_err();
        assert!(matches!(
            err,
            VotetokenError::InsufficientBalance {
                needed: 500,
                available: 499
            }
        ));
        assert!(pv.round().is_none());
    }

    #[test]
    fn second_initiate_while_open_fails() {
        let (mut pv, mut ledger) = setup(&[("a", 1_000), ("b", 1_000)]);
        pv.initiate(&mut ledger, addr("a"), 42, 0).unwrap();
        let err = pv.initiate(&mut ledger, addr("b"), 7, 1).unwrap_err();
        assert_eq!(err, VotetokenError::ActiveVoteOngoing(RoundId(1)));
    }

    #[test]
    fn vote_without_round_fails() {
        let (mut pv, mut ledger) = setup(&[("a", 1_000)]);
        let err = pv.vote(&mut ledger, addr("a"), 42, 0).unwrap_err();
        assert_eq!(err, VotetokenError::InvalidRound);
    }

    #[test]
    fn initiator_cannot_vote_again() {
        let (mut pv, mut ledger) = setup(&[("a", 1_000)]);
        pv.initiate(&mut ledger, addr("a"), 42, 0).unwrap();
        let err = pv.vote(&mut ledger, addr("a"), 42, 1).unwrap_err();
        assert_eq!(err.reason(), "AlreadyVoted");
    }

    #[test]
    fn vote_after_window_fails_but_at_boundary_succeeds() {
        let (mut pv, mut ledger) = setup(&[("a", 1_000), ("b", 600), ("c", 600)]);
        pv.initiate(&mut ledger, addr("a"), 42, 0).unwrap();
        assert!(pv.vote(&mut ledger, addr("b"), 42, WEEK).is_ok());
        let err = pv.vote(&mut ledger, addr("c"), 42, WEEK + 1).unwrap_err();
        assert_eq!(err, VotetokenError::VotingPeriodEnded(RoundId(1)));
    }

    #[test]
    fn heavier_price_wins() {
        let (mut pv, mut ledger) = setup(&[("a", 1_000), ("b", 600), ("c", 700)]);
        pv.initiate(&mut ledger, addr("a"), 10, 0).unwrap();
        pv.vote(&mut ledger, addr("b"), 20, 1).unwrap();
        pv.vote(&mut ledger, addr("c"), 20, 2).unwrap();
        let ev = pv.finalize(&mut ledger, WEEK).unwrap();
        assert_eq!(
            ev,
            Event::VoteFinalized {
                round: RoundId(1),
                winning_price: 20
            }
        );
        assert_eq!(pv.reference_price(), 20);
    }

    #[test]
    fn tie_goes_to_first_submitted_price() {
        let (mut pv, mut ledger) = setup(&[("a", 1_000), ("b", 500), ("c", 500)]);
        pv.initiate(&mut ledger, addr("a"), 10, 0).unwrap();
        pv.vote(&mut ledger, addr("b"), 20, 1).unwrap();
        pv.vote(&mut ledger, addr("c"), 20, 2).unwrap();
        assert_eq!(pv.round().unwrap().weight_for(20), 1_000);
        assert_eq!(pv.round().unwrap().leading_price(), 10);
    }

    #[test]
    fn tie_after_overtake_returns_to_earlier_price() {
        let (mut pv, mut ledger) = setup(&[("a", 600), ("b", 1_200), ("c", 600)]);
        pv.initiate(&mut ledger, addr("a"), 10, 0).unwrap();
        pv.vote(&mut ledger, addr("b"), 20, 1).unwrap();
        assert_eq!(pv.round().unwrap().leading_price(), 20);
        pv.vote(&mut ledger, addr("c"), 10, 2).unwrap();
        assert_eq!(pv.round().unwrap().leading_price(), 10);
    }

    #[test]
    fn finalize_before_end_fails() {
        let (mut pv, mut ledger) = setup(&[("a", 1_000)]);
        pv.initiate(&mut ledger, addr("a"), 42, 10).unwrap();
        let err = pv.finalize(&mut ledger, WEEK).unwrap_err();
        assert_eq!(err.reason(), "VotingPeriodNotEnded");
    }

    #[test]
    fn finalize_twice_fails_and_releases_locks() {
        let (mut pv, mut ledger) = setup(&[("a", 1_000)]);
        pv.initiate(&mut ledger, addr("a"), 42, 0).unwrap();
        pv.finalize(&mut ledger, WEEK + 1).unwrap();
        assert_eq!(ledger.free_balance(addr("a")), 1_000);
        let err = pv.finalize(&mut ledger, WEEK + 2).unwrap_err();
        assert_eq!(err, VotetokenError::AlreadyFinalized(RoundId(1)));
    }

    #[test]
    fn finalize_without_round_fails() {
        let (mut pv, mut ledger) = setup(&[]);
        assert_eq!(
            pv.finalize(&mut ledger, 0).unwrap_err(),
            VotetokenError::InvalidRound
        );
    }

    #[test]
    fn round_slot_reusable_after_finalize() {
        let (mut pv, mut ledger) = setup(&[("a", 1_000)]);
        pv.initiate(&mut ledger, addr("a"), 42, 0).unwrap();
        pv.finalize(&mut ledger, WEEK).unwrap();
        let ev = pv.initiate(&mut ledger, addr("a"), 43, WEEK + 1).unwrap();
        assert!(matches!(ev, Event::VoteInitiated { round: RoundId(2), .. }));
        assert_eq!(ledger.free_balance(addr("a")), 0);
    }

    #[test]
    fn zero_price_rejected() {
        let (mut pv, mut ledger) = setup(&[("a", 1_000)]);
        assert_eq!(
            pv.initiate(&mut ledger, addr("a"), 0, 0).unwrap_err(),
            VotetokenError::ZeroPrice
        );
    }

    #[test]
    fn duration_change_does_not_move_open_round() {
        let (mut pv, mut ledger) = setup(&[("a", 1_000)]);
        pv.initiate(&mut ledger, addr("a"), 42, 0).unwrap();
        pv.set_voting_duration(10).unwrap();
        assert_eq!(pv.round().unwrap().ends_at(), WEEK);
        assert!(pv.set_voting_duration(0).is_err());
    }
}
