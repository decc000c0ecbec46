#![forbid(unsafe_code)]

//! Binding a holder to an [`Observable`] source.
//!
//! [`Mirror`] is the render-loop-free driver: it subscribes to a source and,
//! on each change notification, enqueues a reconciliation on an
//! [`EffectQueue`]. Nothing is reconciled inside the notification itself, so
//! the mirror only catches up when the host flushes the queue.
//!
//! The source deduplicates with `PartialEq` before notifying; the mirror then
//! applies its own equivalence `E` against the last value it saw.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::cached::{CachedState, Reconciled};
use crate::effects::EffectQueue;
use crate::equivalence::{Equivalence, ValueEq};
use crate::observable::{Observable, Subscription};

/// A locally overridable mirror of an [`Observable`].
///
/// Dropping the mirror unsubscribes; reconciliations still queued at that
/// point become no-ops.
pub struct Mirror<T, E = ValueEq> {
    state: Rc<RefCell<CachedState<T, E>>>,
    _subscription: Subscription,
}

impl<T: fmt::Debug, E> fmt::Debug for Mirror<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mirror")
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl<T, E> Mirror<T, E>
where
    T: Clone + PartialEq + 'static,
    E: Equivalence<T> + 'static,
{
    /// Mirror `source`, scheduling reconciliations on `queue`.
    #[must_use]
    pub fn bind(source: &Observable<T>, queue: &EffectQueue) -> Self {
        let state = Rc::new(RefCell::new(CachedState::<T, E>::new(source.get())));

        let target = Rc::downgrade(&state);
        let queue = queue.clone();
        let subscription = source.subscribe(move |value: &T| {
            let target = target.clone();
            let external = value.clone();
            queue.enqueue(move || {
                let Some(state) = target.upgrade() else {
                    return;
                };
                let outcome = state.borrow_mut().reconcile(&external);
                if let Reconciled::Reset {
                    discarded_override: true,
                } = outcome
                {
                    tracing::debug!(message = "mirror.reset", discarded_override = true);
                }
            });
        });

        Self {
            state,
            _subscription: subscription,
        }
    }
}

impl<T: Clone, E> Mirror<T, E> {
    /// Clone of the current local value.
    #[must_use]
    pub fn get(&self) -> T {
        self.state.borrow().get()
    }

    /// Clone of the last external value that changed the mirror.
    #[must_use]
    pub fn last_seen(&self) -> T {
        self.state.borrow().last_seen().clone()
    }
}

impl<T, E> Mirror<T, E> {
    /// Access the current local value by reference.
    ///
    /// # Panics
    ///
    /// Panics if `f` calls [`write`](Self::write) on this mirror, or if a
    /// flush reconciles it from inside `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(self.state.borrow().read())
    }

    /// Override the local value until the source changes.
    pub fn write(&self, value: T) {
        self.state.borrow_mut().write(value);
    }

    #[must_use]
    pub fn is_overridden(&self) -> bool {
        self.state.borrow().is_overridden()
    }
}
