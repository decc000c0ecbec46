#![forbid(unsafe_code)]

//! The mirrored-value holder.
//!
//! # Design
//!
//! [`CachedState<T, E>`] keeps two slots:
//!
//! - `local`: what consumers read. Starts as the first external value and is
//!   replaced either by [`write`](CachedState::write) or by a reconciliation
//!   that detected an external change.
//! - `last_seen`: the external value observed by the most recent
//!   reconciliation that detected a change.
//!
//! # Invariants
//!
//! 1. `local` equals the most recent of: the last written value, or the last
//!    external value that differed from `last_seen` when reconciled.
//! 2. `last_seen` changes only when a reconciliation detects a change.
//! 3. Reconciling with a value equivalent to `last_seen` is a no-op, even if
//!    `local` was overridden.
//!
//! The holder never schedules anything on its own. Callers decide when a
//! reconciliation runs; see [`crate::runtime`] and [`crate::binding`] for
//! the post-commit drivers.

use std::fmt;
use std::marker::PhantomData;

use crate::equivalence::{Equivalence, ValueEq};

/// Outcome of a single [`CachedState::reconcile`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The external value matched the last-seen value; nothing changed.
    Unchanged,
    /// The external value changed and replaced the local value.
    Reset {
        /// Whether a consumer override was thrown away.
        discarded_override: bool,
    },
}

impl Reconciled {
    /// Whether the local value was replaced.
    #[inline]
    #[must_use]
    pub fn is_reset(self) -> bool {
        matches!(self, Self::Reset { .. })
    }
}

/// Local, overridable copy of an externally supplied value.
pub struct CachedState<T, E = ValueEq> {
    local: T,
    last_seen: T,
    overridden: bool,
    _eq: PhantomData<fn() -> E>,
}

impl<T: Clone, E: Equivalence<T>> CachedState<T, E> {
    /// Create a holder from the first external value.
    #[must_use]
    pub fn new(external: T) -> Self {
        Self {
            local: external.clone(),
            last_seen: external,
            overridden: false,
            _eq: PhantomData,
        }
    }

    /// Compare `external` with the last-seen value and, if it changed,
    /// replace both the bookkeeping and the local value.
    pub fn reconcile(&mut self, external: &T) -> Reconciled {
        if E::equivalent(external, &self.last_seen) {
            return Reconciled::Unchanged;
        }
        self.last_seen = external.clone();
        self.local = external.clone();
        let discarded_override = std::mem::replace(&mut self.overridden, false);
        Reconciled::Reset { discarded_override }
    }
}

impl<T, E> CachedState<T, E> {
    /// Current local value.
    #[inline]
    #[must_use]
    pub fn read(&self) -> &T {
        &self.local
    }

    /// Replace the local value. Kept until the external value changes.
    pub fn write(&mut self, value: T) {
        self.local = value;
        self.overridden = true;
    }

    /// External value recorded by the last detected change.
    #[inline]
    #[must_use]
    pub fn last_seen(&self) -> &T {
        &self.last_seen
    }

    /// Whether a write happened since the last reset.
    #[inline]
    #[must_use]
    pub fn is_overridden(&self) -> bool {
        self.overridden
    }

    /// Consume the holder, returning the local value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.local
    }
}

impl<T: Clone, E> CachedState<T, E> {
    /// Clone of the current local value.
    #[inline]
    #[must_use]
    pub fn get(&self) -> T {
        self.local.clone()
    }
}

impl<T: Clone, E> Clone for CachedState<T, E> {
    fn clone(&self) -> Self {
        Self {
            local: self.local.clone(),
            last_seen: self.last_seen.clone(),
            overridden: self.overridden,
            _eq: PhantomData,
        }
    }
}

impl<T: fmt::Debug, E> fmt::Debug for CachedState<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedState")
            .field("local", &self.local)
            .field("last_seen", &self.last_seen)
            .field("overridden", &self.overridden)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equivalence::PtrEq;
    use std::rc::Rc;

    #[test]
    fn initial_value_is_external() {
        let state: CachedState<&str> = CachedState::new("A");
        assert_eq!(*state.read(), "A");
        assert_eq!(*state.last_seen(), "A");
        assert!(!state.is_overridden());
    }

    #[test]
    fn override_then_external_change() {
        let mut state: CachedState<String> = CachedState::new("A".into());
        assert_eq!(state.read(), "A");

        state.write("B".into());
        assert_eq!(state.read(), "B");
        assert!(state.is_overridden());

        let outcome = state.reconcile(&"C".into());
        assert_eq!(
            outcome,
            Reconciled::Reset {
                discarded_override: true
            }
        );
        assert_eq!(state.read(), "C");
        assert!(!state.is_overridden());

        assert_eq!(state.reconcile(&"C".into()), Reconciled::Unchanged);
        assert_eq!(state.read(), "C");
    }

    #[test]
    fn unchanged_external_keeps_override() {
        let mut state: CachedState<i32> = CachedState::new(0);
        state.write(5);
        for _ in 0..10 {
            assert_eq!(state.reconcile(&0), Reconciled::Unchanged);
            assert_eq!(*state.read(), 5);
        }
    }

    #[test]
    fn external_returning_to_override_value_still_resets() {
        let mut state: CachedState<i32> = CachedState::new(1);
        state.write(7);
        assert!(state.reconcile(&7).is_reset());
        assert_eq!(*state.read(), 7);
        assert_eq!(*state.last_seen(), 7);
        assert!(!state.is_overridden());
    }

    #[test]
    fn external_returning_to_earlier_value_resets() {
        let mut state: CachedState<i32> = CachedState::new(1);
        assert!(state.reconcile(&2).is_reset());
        state.write(9);
        assert_eq!(
            state.reconcile(&1),
            Reconciled::Reset {
                discarded_override: true
            }
        );
        assert_eq!(*state.read(), 1);
    }

    #[test]
    fn reset_without_override() {
        let mut state: CachedState<u8> = CachedState::new(1);
        assert_eq!(
            state.reconcile(&2),
            Reconciled::Reset {
                discarded_override: false
            }
        );
    }

    #[test]
    fn ptr_eq_treats_equal_contents_as_change() {
        let first = Rc::new(String::from("same"));
        let mut state: CachedState<Rc<String>, PtrEq> = CachedState::new(Rc::clone(&first));
        state.write(Rc::new(String::from("local")));

        // Same allocation: no change.
        assert_eq!(state.reconcile(&first), Reconciled::Unchanged);
        assert_eq!(state.read().as_str(), "local");

        // Equal contents, different allocation: change.
        let twin = Rc::new(String::from("same"));
        assert!(state.reconcile(&twin).is_reset());
        assert!(Rc::ptr_eq(state.read(), &twin));
    }

    #[test]
    fn get_clones_local() {
        let mut state: CachedState<Vec<u8>> = CachedState::new(vec![1]);
        state.write(vec![2, 3]);
        assert_eq!(state.get(), vec![2, 3]);
        assert_eq!(state.into_inner(), vec![2, 3]);
    }

    #[test]
    fn clone_is_independent() {
        let mut a: CachedState<i32> = CachedState::new(1);
        let b = a.clone();
        a.write(2);
        assert_eq!(*a.read(), 2);
        assert_eq!(*b.read(), 1);
    }

    #[test]
    fn debug_format() {
        let state: CachedState<i32> = CachedState::new(42);
        let dbg = format!("{state:?}");
        assert!(dbg.contains("CachedState"));
        assert!(dbg.contains("42"));
    }
}
