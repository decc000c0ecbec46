#![no_main]

use arbitrary::Arbitrary;
use cached_state::{CachedState, ReactiveError, RuntimeConfig, Scope};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum FuzzStep {
    /// Render both hooks with these external values.
    Render(u8, u8),
    /// Write through the setter of hook 0 or 1.
    Set { hook: bool, value: u8 },
    Unmount,
}

fuzz_target!(|steps: Vec<FuzzStep>| {
    let mut scope = Scope::new(RuntimeConfig::default().with_max_render_passes(8));
    let mut setters = None;
    let mut models: Option<[CachedState<u8>; 2]> = None;

    for step in steps.into_iter().take(1024) {
        match step {
            FuzzStep::Render(a, b) => {
                let ((va, sa), (vb, sb)) = scope
                    .render(|hooks| (hooks.use_cached_state(a), hooks.use_cached_state(b)))
                    .unwrap();
                let models = models.get_or_insert_with(|| [CachedState::new(a), CachedState::new(b)]);
                models[0].reconcile(&a);
                models[1].reconcile(&b);
                assert_eq!(va, *models[0].read());
                assert_eq!(vb, *models[1].read());
                setters = Some((sa, sb));
            }
            FuzzStep::Set { hook, value } => {
                if let Some((sa, sb)) = &setters {
                    let setter = if hook { sb } else { sa };
                    match setter.try_set(value) {
                        Ok(()) => {
                            if let Some(models) = models.as_mut() {
                                models[usize::from(hook)].write(value);
                            }
                        }
                        Err(err) => assert_eq!(err, ReactiveError::Detached),
                    }
                }
            }
            FuzzStep::Unmount => {
                scope.unmount();
                models = None;
            }
        }
    }
});
