//! Per-instance reentrancy guard.
//!
//! Every state-mutating entry point of [`crate::TradableToken`] enters the
//! guard first, so guarded calls on one instance run one at a time in the
//! order they acquire it.
//!
//! - A call from another thread waits until the holder returns.
//! - A nested call from the holding thread (for example from inside a
//!   `sell` payout callback, at any depth) fails with
//!   [`VotetokenError::ReentrantCall`] instead of deadlocking.

use std::{
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, ThreadId},
};

use votetoken_types::{Result, VotetokenError};

/// Owner-tracking mutex held for the duration of a guarded call.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    owner: Mutex<Option<ThreadId>>,
    released: Condvar,
}

/// Proof that the guard is held. Releases it on drop, on every return path.
#[derive(Debug)]
#[must_use = "the guard is released as soon as this value is dropped"]
pub struct Entered<'a> {
    guard: &'a ReentrancyGuard,
}

impl ReentrancyGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn owner(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.owner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enter a guarded section for `operation`, waiting for any other
    /// thread's call to finish.
    ///
    /// # Errors
    /// `ReentrantCall` if the current thread already holds the guard.
    pub fn enter(&self, operation: &'static str) -> Result<Entered<'_>> {
        let me = thread::current().id();
        let mut owner = self.owner();
        if *owner == Some(me) {
            tracing::warn!(operation, "Reentrant call rejected");
            return Err(VotetokenError::ReentrantCall { operation });
        }
        while owner.is_some() {
            owner = self
                .released
                .wait(owner)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *owner = Some(me);
        Ok(Entered { guard: self })
    }

    /// Whether a guarded call is in progress on any thread.
    #[must_use]
    pub fn is_entered(&self) -> bool {
        self.owner().is_some()
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        *self.guard.owner() = None;
        self.guard.released.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        time::Duration,
    };

    use super::*;

    #[test]
    fn first_entry_allowed() {
        let guard = ReentrancyGuard::new();
        assert!(!guard.is_entered());
        let entered = guard.enter("transfer").unwrap();
        assert!(guard.is_entered());
        drop(entered);
        assert!(!guard.is_entered());
    }

    #[test]
    fn nested_entry_rejected() {
        let guard = ReentrancyGuard::new();
        let _outer = guard.enter("sell").unwrap();
        let err = guard.enter("sell").unwrap_err();
        assert_eq!(err, VotetokenError::ReentrantCall { operation: "sell" });
    }

    #[test]
    fn released_after_error_path() {
        fn failing(guard: &ReentrancyGuard) -> Result<()> {
            let _entered = guard.enter("buy")?;
            Err(VotetokenError::ZeroPayment)
        }
        let guard = ReentrancyGuard::new();
        assert!(failing(&guard).is_err());
        assert!(guard.enter("buy").is_ok());
    }

    #[test]
    fn other_thread_waits_instead_of_failing() {
        let guard = Arc::new(ReentrancyGuard::new());
        let done = Arc::new(AtomicBool::new(false));
        let held = guard.enter("sell").unwrap();

        let waiter = {
            let guard = guard.clone();
            let done = done.clone();
            thread::spawn(move || {
                let entered = guard.enter("transfer");
                done.store(true, Ordering::SeqCst);
                entered.map(|_| ())
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!done.load(Ordering::SeqCst), "waiter ran while guard held");
        drop(held);
        assert_eq!(waiter.join().unwrap(), Ok(()));
        assert!(!guard.is_entered());
    }
}
