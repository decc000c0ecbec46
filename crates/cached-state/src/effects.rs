#![forbid(unsafe_code)]

//! Post-commit effect scheduling.
//!
//! Reconciliation must never mutate state while the value it reconciles
//! against is still being produced. [`EffectQueue`] enforces that ordering:
//! work is enqueued at any time, a render pass is bracketed by a
//! [`RenderGuard`], and [`flush`](EffectQueue::flush) refuses to run while a
//! guard is alive.
//!
//! # Invariants
//!
//! 1. Effects run in enqueue order (FIFO), including effects enqueued by
//!    other effects during the same flush.
//! 2. No effect runs while a render pass is open.
//! 3. A flush never runs inside another flush.
//! 4. Each effect runs at most once.
//!
//! # Failure Modes
//!
//! - **Effect panics**: the flush unwinds, the flushing flag is reset by its
//!   guard, and the remaining effects stay queued for the next flush.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::error::{ReactiveError, Result};

type Effect = Box<dyn FnOnce()>;

#[derive(Default)]
struct QueueState {
    effects: RefCell<VecDeque<Effect>>,
    render_depth: Cell<usize>,
    flushing: Cell<bool>,
    /// Total effects run over the queue's lifetime.
    ran_total: Cell<u64>,
}

/// Shared FIFO of effects that run after a render pass commits.
///
/// Cloning creates another handle to the same queue.
#[derive(Clone, Default)]
pub struct EffectQueue {
    state: Rc<QueueState>,
}

impl fmt::Debug for EffectQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectQueue")
            .field("pending", &self.pending())
            .field("rendering", &self.is_rendering())
            .field("flushing", &self.state.flushing.get())
            .finish()
    }
}

impl EffectQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `effect` for the next flush.
    pub fn enqueue(&self, effect: impl FnOnce() + 'static) {
        self.state.effects.borrow_mut().push_back(Box::new(effect));
    }

    /// Open a render pass. Flushing is rejected until the guard drops.
    #[must_use = "the render pass ends when the guard is dropped"]
    pub fn begin_render(&self) -> RenderGuard {
        let depth = self.state.render_depth.get();
        self.state.render_depth.set(depth + 1);
        RenderGuard {
            state: Rc::clone(&self.state),
        }
    }

    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.state.render_depth.get() > 0
    }

    /// Number of queued effects.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.effects.borrow().len()
    }

    /// Total effects run since the queue was created.
    #[must_use]
    pub fn ran_total(&self) -> u64 {
        self.state.ran_total.get()
    }

    /// Run all queued effects, returning how many ran.
    pub fn flush(&self) -> Result<usize> {
        if self.is_rendering() {
            return Err(ReactiveError::FlushDuringRender);
        }
        if self.state.flushing.get() {
            return Err(ReactiveError::ReentrantFlush);
        }

        let _flushing = FlushingGuard::enter(&self.state);
        let mut ran = 0usize;
        loop {
            // Release the borrow before running so effects can enqueue.
            let next = self.state.effects.borrow_mut().pop_front();
            let Some(effect) = next else { break };
            effect();
            ran += 1;
            self.state.ran_total.set(self.state.ran_total.get() + 1);
        }

        if ran > 0 {
            tracing::trace!(message = "effects.flush", ran);
        }
        Ok(ran)
    }

    /// Drop all pending effects without running them.
    pub fn clear(&self) -> usize {
        let dropped: VecDeque<Effect> = std::mem::take(&mut *self.state.effects.borrow_mut());
        dropped.len()
    }
}

/// Marks a render pass as open on its [`EffectQueue`].
pub struct RenderGuard {
    state: Rc<QueueState>,
}

impl fmt::Debug for RenderGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderGuard")
            .field("depth", &self.state.render_depth.get())
            .finish()
    }
}

impl Drop for RenderGuard {
    fn drop(&mut self) {
        let depth = self.state.render_depth.get();
        self.state.render_depth.set(depth.saturating_sub(1));
    }
}

struct FlushingGuard<'a> {
    state: &'a QueueState,
}

impl<'a> FlushingGuard<'a> {
    fn enter(state: &'a QueueState) -> Self {
        state.flushing.set(true);
        Self { state }
    }
}

impl Drop for FlushingGuard<'_> {
    fn drop(&mut self) {
        self.state.flushing.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_in_fifo_order() {
        let queue = EffectQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = Rc::clone(&log);
            queue.enqueue(move || log.borrow_mut().push(i));
        }
        assert_eq!(queue.pending(), 3);
        assert_eq!(queue.flush(), Ok(3));
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.ran_total(), 3);
    }

    #[test]
    fn flush_rejected_while_rendering() {
        let queue = EffectQueue::new();
        let ran = Rc::new(Cell::new(false));
        let ran_clone = Rc::clone(&ran);
        queue.enqueue(move || ran_clone.set(true));

        let guard = queue.begin_render();
        assert!(queue.is_rendering());
        assert_eq!(queue.flush(), Err(ReactiveError::FlushDuringRender));
        assert!(!ran.get());

        drop(guard);
        assert!(!queue.is_rendering());
        assert_eq!(queue.flush(), Ok(1));
        assert!(ran.get());
    }

    #[test]
    fn nested_render_guards() {
        let queue = EffectQueue::new();
        let outer = queue.begin_render();
        let inner = queue.begin_render();
        drop(inner);
        assert!(queue.is_rendering());
        drop(outer);
        assert!(!queue.is_rendering());
    }

    #[test]
    fn effects_enqueued_during_flush_run_same_flush() {
        let queue = EffectQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let q = queue.clone();
        let l = Rc::clone(&log);
        queue.enqueue(move || {
            l.borrow_mut().push("outer");
            let l2 = Rc::clone(&l);
            q.enqueue(move || l2.borrow_mut().push("chained"));
        });
        assert_eq!(queue.flush(), Ok(2));
        assert_eq!(*log.borrow(), vec!["outer", "chained"]);
    }

    #[test]
    fn reentrant_flush_is_rejected() {
        let queue = EffectQueue::new();
        let seen = Rc::new(RefCell::new(None));
        let q = queue.clone();
        let s = Rc::clone(&seen);
        queue.enqueue(move || *s.borrow_mut() = Some(q.flush()));
        assert_eq!(queue.flush(), Ok(1));
        assert_eq!(*seen.borrow(), Some(Err(ReactiveError::ReentrantFlush)));
    }

    #[test]
    fn clear_drops_without_running() {
        let queue = EffectQueue::new();
        let ran = Rc::new(Cell::new(false));
        let ran_clone = Rc::clone(&ran);
        queue.enqueue(move || ran_clone.set(true));
        assert_eq!(queue.clear(), 1);
        assert_eq!(queue.flush(), Ok(0));
        assert!(!ran.get());
    }

    #[test]
    fn empty_flush() {
        let queue = EffectQueue::new();
        assert_eq!(queue.flush(), Ok(0));
        assert!(format!("{queue:?}").contains("EffectQueue"));
    }
}
