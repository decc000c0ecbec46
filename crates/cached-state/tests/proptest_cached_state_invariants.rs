#![forbid(unsafe_code)]

//! Property-based invariant tests for cached state.
//!
//! These tests check, for **any** interleaving of external updates and
//! consumer writes:
//!
//! 1. The holder agrees with a reference model of "most recent of last write
//!    or last changed external value".
//! 2. With no repeated external values, the local value always equals the
//!    latest external value.
//! 3. A write survives any number of re-supplied equal external values.
//! 4. The hook runtime and the observable mirror agree with the holder.

use cached_state::{CachedState, EffectQueue, Mirror, Observable, Reconciled, Scope};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Op {
    External(u8),
    Write(u8),
}

/// Small value domain so that repeated external values are common.
fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..4).prop_map(Op::External),
        1 => (0u8..4).prop_map(Op::Write),
    ]
}

fn op_sequence() -> impl Strategy<Value = (u8, Vec<Op>)> {
    (0u8..4, proptest::collection::vec(op(), 0..64))
}

// ── Reference model ─────────────────────────────────────────────────────

struct Model {
    local: u8,
    last_seen: u8,
}

impl Model {
    fn new(initial: u8) -> Self {
        Self {
            local: initial,
            last_seen: initial,
        }
    }

    fn apply(&mut self, op: Op) {
        match op {
            Op::External(v) => {
                if v != self.last_seen {
                    self.last_seen = v;
                    self.local = v;
                }
            }
            Op::Write(v) => self.local = v,
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Holder matches the reference model
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn holder_matches_model((initial, ops) in op_sequence()) {
        let mut state: CachedState<u8> = CachedState::new(initial);
        let mut model = Model::new(initial);

        for op in ops {
            match op {
                Op::External(v) => {
                    let changed = v != model.last_seen;
                    let outcome = state.reconcile(&v);
                    prop_assert_eq!(outcome.is_reset(), changed);
                }
                Op::Write(v) => state.write(v),
            }
            model.apply(op);
            prop_assert_eq!(*state.read(), model.local);
            prop_assert_eq!(*state.last_seen(), model.last_seen);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Distinct external sequences always win
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn distinct_externals_track_latest(values in proptest::collection::vec(any::<u16>(), 1..64)) {
        let mut deduped = values.clone();
        deduped.dedup();

        let mut state: CachedState<u16> = CachedState::new(deduped[0]);
        for &v in &deduped[1..] {
            prop_assert!(state.reconcile(&v).is_reset());
            prop_assert_eq!(*state.read(), v);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Writes survive equal external values
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn write_survives_equal_externals(initial in any::<i64>(), written in any::<i64>(), cycles in 0usize..32) {
        let mut state: CachedState<i64> = CachedState::new(initial);
        state.write(written);
        for _ in 0..cycles {
            prop_assert_eq!(state.reconcile(&initial), Reconciled::Unchanged);
        }
        prop_assert_eq!(*state.read(), written);
        prop_assert!(state.is_overridden());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Hook runtime and mirror agree with the model
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn hook_matches_model((initial, ops) in op_sequence()) {
        let mut scope = Scope::default();
        let mut model = Model::new(initial);
        let mut external = initial;

        let (value, mut setter) = scope.render(|hooks| hooks.use_cached_state(external)).unwrap();
        prop_assert_eq!(value, model.local);

        for op in ops {
            match op {
                Op::External(v) => external = v,
                Op::Write(v) => setter.set(v),
            }
            model.apply(op);

            let (value, next_setter) = scope.render(|hooks| hooks.use_cached_state(external)).unwrap();
            setter = next_setter;
            prop_assert_eq!(value, model.local);
        }
    }

    #[test]
    fn mirror_matches_model((initial, ops) in op_sequence()) {
        let source = Observable::new(initial);
        let queue = EffectQueue::new();
        let mirror: Mirror<u8> = Mirror::bind(&source, &queue);
        let mut model = Model::new(initial);

        for op in ops {
            match op {
                Op::External(v) => source.set(v),
                Op::Write(v) => mirror.write(v),
            }
            queue.flush().unwrap();
            model.apply(op);
            prop_assert_eq!(mirror.get(), model.local);
        }
    }
}
