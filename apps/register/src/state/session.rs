//! # Session State
//!
//! The signed-in cashier for this register, carried into every mutating
//! command as an explicit [`RequestContext`], plus the checkout submit lock.
//!
//! ## Submit Lock
//! ```text
//! click "Charge" ──► try_acquire() ──► Some(guard) ──► create_sale ... ──► drop(guard)
//! click again    ──► try_acquire() ──► None ──► CHECKOUT_IN_PROGRESS
//! ```
//!
//! The lock only stops one register from submitting twice. Two registers
//! selling the last unit are resolved by the guarded decrement in the store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use tally_core::RequestContext;

/// Per-session flag rejecting re-entrant checkout submission.
#[derive(Debug, Default)]
pub struct SubmitLock {
    in_flight: AtomicBool,
}

/// Releases the [`SubmitLock`] when dropped.
#[derive(Debug)]
pub struct SubmitGuard<'a> {
    lock: &'a SubmitLock,
}

impl SubmitLock {
    pub fn new() -> Self {
        SubmitLock::default()
    }

    /// Takes the lock, or `None` if a submission is already running.
    pub fn try_acquire(&self) -> Option<SubmitGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitGuard { lock: self })
    }

    pub fn is_held(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.lock.in_flight.store(false, Ordering::Release);
    }
}

#[derive(Debug, Default)]
pub struct SessionState {
    context: RwLock<RequestContext>,
    submit: SubmitLock,
}

impl SessionState {
    pub fn new() -> Self {
        SessionState::default()
    }

    /// Snapshot of the current context (anonymous when signed out).
    pub fn context(&self) -> RequestContext {
        self.context
            .read()
            .map(|ctx| ctx.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn set_context(&self, ctx: RequestContext) {
        match self.context.write() {
            Ok(mut guard) => *guard = ctx,
            Err(poisoned) => *poisoned.into_inner() = ctx,
        }
    }

    pub fn sign_out(&self) {
        self.set_context(RequestContext::anonymous());
    }

    pub fn submit_lock(&self) -> &SubmitLock {
        &self.submit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{Actor, UserRole};

    #[test]
    fn test_submit_lock_is_exclusive_until_dropped() {
        let lock = SubmitLock::new();

        let guard = lock.try_acquire().unwrap();
        assert!(lock.is_held());
        assert!(lock.try_acquire().is_none());

        drop(guard);
        assert!(!lock.is_held());
        assert!(lock.try_acquire().is_some());
    }

    #[test]
    fn test_session_context_round_trip() {
        let session = SessionState::new();
        assert!(session.context().actor().is_none());

        session.set_context(RequestContext::for_actor(Actor::new("u-1", "Ana", UserRole::Cashier)));
        assert_eq!(session.context().user_id(), Some("u-1"));

        session.sign_out();
        assert!(session.context().user_id().is_none());
    }
}
