#![no_main]

use arbitrary::Arbitrary;
use cached_state::{CachedState, EffectQueue, Mirror, Observable};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug, Clone, Copy)]
enum FuzzOp {
    External(u8),
    Write(u8),
    Flush,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    initial: u8,
    ops: Vec<FuzzOp>,
}

fuzz_target!(|input: FuzzInput| {
    let mut state: CachedState<u8> = CachedState::new(input.initial);
    let (mut local, mut last_seen) = (input.initial, input.initial);

    let source = Observable::new(input.initial);
    let queue = EffectQueue::new();
    let mirror: Mirror<u8> = Mirror::bind(&source, &queue);

    for op in input.ops.into_iter().take(4096) {
        match op {
            FuzzOp::External(v) => {
                let reset = state.reconcile(&v).is_reset();
                assert_eq!(reset, v != last_seen);
                if reset {
                    last_seen = v;
                    local = v;
                }
                source.set(v);
                queue.flush().unwrap();
            }
            FuzzOp::Write(v) => {
                state.write(v);
                mirror.write(v);
                local = v;
            }
            FuzzOp::Flush => {
                assert_eq!(queue.flush(), Ok(0));
            }
        }
        assert_eq!(*state.read(), local);
        assert_eq!(*state.last_seen(), last_seen);
        assert_eq!(mirror.get(), local);
    }
});
