#![forbid(unsafe_code)]

//! Hook scopes: driving [`CachedState`] through render/commit/effect cycles.
//!
//! A [`Scope`] plays the role of one mounted component. Each call to
//! [`Scope::render`] runs the component closure with a [`Hooks`] handle;
//! hooks are matched to their storage by call order, so a component must call
//! the same hooks in the same order on every render.
//!
//! # Cycle
//!
//! ```text
//! render pass ──> commit ──> flush effects ──> re-render requested? ──┐
//!      ^                                                               │
//!      └───────────────────────────── yes ─────────────────────────────┘
//! ```
//!
//! [`Hooks::use_cached_state`] returns the holder's current local value and
//! enqueues a reconciliation against the supplied external value. The
//! reconciliation runs only after the pass has committed, never during it.
//! When it resets the local value the scope renders again so the output
//! reflects the new value. Setter calls also request a re-render.
//!
//! # Invariants
//!
//! 1. No holder is reconciled while a render pass is open.
//! 2. `render` returns the output of a pass after which no re-render was
//!    requested, or fails with [`ReactiveError::UpdateDepthExceeded`].
//! 3. After [`Scope::unmount`], every [`Setter`] handed out earlier is
//!    detached; remounting creates fresh holders.
//!
//! 4. A hook's reconciliation requests at most one re-render per `render`
//!    call. A strategy under which a value is not equivalent to itself
//!    (`ValueEq` on `NaN`) therefore still settles. The hook just resets to
//!    the external value on every call.
//! 5. A pass that fails with [`ReactiveError::HookOrderMismatch`] leaves the
//!    scope's holders untouched.

use std::any::{Any, type_name};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::cached::{CachedState, Reconciled};
use crate::config::RuntimeConfig;
use crate::effects::EffectQueue;
use crate::equivalence::{Equivalence, ValueEq};
use crate::error::{ReactiveError, Result};

const NO_HOOK: &str = "<none>";

struct Slot {
    kind: &'static str,
    state: Rc<dyn Any>,
    /// Render cycle in which this hook last requested a re-render.
    reset_cycle: Rc<Cell<u64>>,
}

/// Storage and scheduling for one mounted component.
pub struct Scope {
    config: RuntimeConfig,
    queue: EffectQueue,
    slots: Vec<Slot>,
    rerender: Rc<Cell<bool>>,
    mounted: bool,
    render_count: u64,
    /// Incremented once per `render` call.
    cycle: u64,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("hooks", &self.slots.len())
            .field("mounted", &self.mounted)
            .field("render_count", &self.render_count)
            .field("needs_render", &self.rerender.get())
            .finish()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl Scope {
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            queue: EffectQueue::new(),
            slots: Vec::new(),
            rerender: Rc::new(Cell::new(false)),
            mounted: false,
            render_count: 0,
            cycle: 0,
        }
    }

    /// Render until settled and return the final pass's output.
    ///
    /// The first call mounts the scope.
    pub fn render<R>(&mut self, mut component: impl FnMut(&mut Hooks<'_>) -> R) -> Result<R> {
        let limit = self.config.max_render_passes.max(1);
        let mut passes = 0usize;
        self.cycle += 1;
        loop {
            passes += 1;
            self.rerender.set(false);

            let output = match self.render_pass(&mut component) {
                Ok(output) => output,
                Err(err) => {
                    self.queue.clear();
                    return Err(err);
                }
            };
            self.queue.flush()?;

            if !self.rerender.get() {
                return Ok(output);
            }
            if passes >= limit {
                tracing::warn!(message = "cached_state.update_depth_exceeded", passes);
                return Err(ReactiveError::UpdateDepthExceeded { passes });
            }
        }
    }

    fn render_pass<R>(&mut self, component: &mut impl FnMut(&mut Hooks<'_>) -> R) -> Result<R> {
        let _pass = self.queue.begin_render();
        let mut hooks = Hooks {
            slots: &mut self.slots,
            cursor: 0,
            mounting: !self.mounted,
            queue: &self.queue,
            rerender: &self.rerender,
            cycle: self.cycle,
            trace: self.config.trace_reconcile,
            fault: None,
        };
        let output = component(&mut hooks);
        hooks.finish()?;

        self.mounted = true;
        self.render_count += 1;
        Ok(output)
    }

    /// Tear down all holders. Outstanding setters become detached.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        let hooks = self.slots.len();
        let dropped_effects = self.queue.clear();
        self.slots.clear();
        self.rerender.set(false);
        self.mounted = false;
        tracing::debug!(message = "cached_state.unmount", hooks, dropped_effects);
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Whether a setter asked for a re-render since the last settled render.
    #[must_use]
    pub fn needs_render(&self) -> bool {
        self.rerender.get()
    }

    /// Total render passes, including re-renders while settling.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.render_count
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

/// Hook access for a single render pass.
pub struct Hooks<'a> {
    slots: &'a mut Vec<Slot>,
    cursor: usize,
    mounting: bool,
    queue: &'a EffectQueue,
    rerender: &'a Rc<Cell<bool>>,
    cycle: u64,
    trace: bool,
    fault: Option<ReactiveError>,
}

impl fmt::Debug for Hooks<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("cursor", &self.cursor)
            .field("mounting", &self.mounting)
            .finish()
    }
}

impl Hooks<'_> {
    /// Mirror `external` into a locally overridable value, compared with
    /// [`ValueEq`].
    ///
    /// Requires `Eq` so the comparison is reflexive. Types like `f64` go
    /// through [`use_cached_state_with`](Self::use_cached_state_with) with an
    /// explicit strategy.
    pub fn use_cached_state<T>(&mut self, external: T) -> (T, Setter<T>)
    where
        T: Clone + Eq + 'static,
    {
        self.use_cached_state_with::<T, ValueEq>(external)
    }

    /// Mirror `external` using the equivalence strategy `E`.
    ///
    /// A hook requests at most one re-render per [`Scope::render`] call, so a
    /// strategy that never matches a value with itself still settles. It
    /// just resets to the external value on every call.
    pub fn use_cached_state_with<T, E>(&mut self, external: T) -> (T, Setter<T>)
    where
        T: Clone + 'static,
        E: Equivalence<T> + 'static,
    {
        let index = self.cursor;
        self.cursor += 1;

        let (cell, reset_cycle) = self.resolve_slot::<T, E>(index, &external);
        let current = cell.borrow().get();

        let erased: Rc<dyn WriteSlot<T>> = cell.clone();
        let setter = Setter {
            target: Rc::downgrade(&erased),
            rerender: Rc::downgrade(self.rerender),
        };

        let target = Rc::downgrade(&cell);
        let rerender = Rc::clone(self.rerender);
        let cycle = self.cycle;
        let trace = self.trace;
        self.queue.enqueue(move || {
            let Some(cell) = target.upgrade() else {
                return;
            };
            let outcome = cell.borrow_mut().reconcile(&external);
            match outcome {
                Reconciled::Reset {
                    discarded_override: true,
                } => {
                    tracing::debug!(message = "cached_state.reset", hook = index, discarded_override = true);
                    if reset_cycle.replace(cycle) != cycle {
                        rerender.set(true);
                    }
                }
                Reconciled::Reset {
                    discarded_override: false,
                } => {
                    tracing::trace!(message = "cached_state.reset", hook = index, discarded_override = false);
                    if reset_cycle.replace(cycle) != cycle {
                        rerender.set(true);
                    }
                }
                Reconciled::Unchanged => {
                    if trace {
                        tracing::trace!(message = "cached_state.unchanged", hook = index);
                    }
                }
            }
        });

        (current, setter)
    }

    /// Find or create the holder for hook `index`.
    ///
    /// A mismatched hook gets a detached holder so the failed pass leaves the
    /// scope's storage untouched.
    fn resolve_slot<T, E>(
        &mut self,
        index: usize,
        external: &T,
    ) -> (Rc<RefCell<CachedState<T, E>>>, Rc<Cell<u64>>)
    where
        T: Clone + 'static,
        E: Equivalence<T> + 'static,
    {
        let kind = type_name::<CachedState<T, E>>();
        let fresh = || Rc::new(RefCell::new(CachedState::<T, E>::new(external.clone())));

        let existing = self
            .slots
            .get(index)
            .map(|slot| (slot.kind, Rc::clone(&slot.state), Rc::clone(&slot.reset_cycle)));

        match existing {
            Some((expected, state, reset_cycle)) => {
                match state.downcast::<RefCell<CachedState<T, E>>>() {
                    Ok(cell) => (cell, reset_cycle),
                    Err(_) => {
                        self.record_fault(ReactiveError::HookOrderMismatch {
                            index,
                            expected,
                            found: kind,
                        });
                        (fresh(), Rc::new(Cell::new(0)))
                    }
                }
            }
            None if !self.mounting => {
                self.record_fault(ReactiveError::HookOrderMismatch {
                    index,
                    expected: NO_HOOK,
                    found: kind,
                });
                (fresh(), Rc::new(Cell::new(0)))
            }
            None => {
                let cell = fresh();
                let reset_cycle = Rc::new(Cell::new(0));
                self.slots.push(Slot {
                    kind,
                    state: cell.clone(),
                    reset_cycle: Rc::clone(&reset_cycle),
                });
                (cell, reset_cycle)
            }
        }
    }

    fn record_fault(&mut self, err: ReactiveError) {
        if self.fault.is_none() {
            self.fault = Some(err);
        }
    }

    fn finish(mut self) -> Result<()> {
        if !self.mounting && self.cursor < self.slots.len() {
            let expected = self.slots[self.cursor].kind;
            self.record_fault(ReactiveError::HookOrderMismatch {
                index: self.cursor,
                expected,
                found: NO_HOOK,
            });
        }
        match self.fault {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

trait WriteSlot<T> {
    fn write(&self, value: T);
}

impl<T, E> WriteSlot<T> for RefCell<CachedState<T, E>> {
    fn write(&self, value: T) {
        self.borrow_mut().write(value);
    }
}

/// Handle for overriding a hook's local value.
///
/// Cloneable; every clone targets the same holder. The holder is owned by
/// its [`Scope`], so a setter never keeps it alive past unmount.
pub struct Setter<T> {
    target: Weak<dyn WriteSlot<T>>,
    rerender: Weak<Cell<bool>>,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            target: Weak::clone(&self.target),
            rerender: Weak::clone(&self.rerender),
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl<T> Setter<T> {
    /// Override the local value and request a re-render.
    ///
    /// Does nothing once the owning scope has unmounted.
    pub fn set(&self, value: T) {
        if self.try_set(value).is_err() {
            tracing::debug!(message = "cached_state.detached_write");
        }
    }

    /// Like [`set`](Self::set), but reports a detached target.
    pub fn try_set(&self, value: T) -> Result<()> {
        let target = self.target.upgrade().ok_or(ReactiveError::Detached)?;
        target.write(value);
        if let Some(flag) = self.rerender.upgrade() {
            flag.set(true);
        }
        Ok(())
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.target.strong_count() > 0
    }
}
