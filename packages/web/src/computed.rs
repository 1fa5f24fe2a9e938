//! The client-computed registry and `useComputed` hook facade (§3): derived values computed
//! locally from state, recomputed only when their declared dependencies change — built
//! directly on `minimact-hooks`' `use_state`/`use_effect`, the same way the teacher's own
//! higher-level hooks (`use_memo`) compose out of its lower-level ones rather than reaching
//! back into the runtime directly.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::Serialize;

use minimact_hooks::{use_effect, use_state, ComponentId, StateHandle};

/// Derive a value from `compute`, recomputing only when `deps` changes (by canonical JSON
/// equality, like [`minimact_hooks::use_effect`]).
pub fn use_computed<D, T>(deps: D, compute: impl Fn() -> T + 'static) -> StateHandle<T>
where
    D: Serialize,
    T: Clone + 'static,
{
    let compute = Rc::new(compute);

    let initial = {
        let compute = compute.clone();
        move || compute()
    };
    let state = use_state(initial);

    let effect_state = state;
    let effect_compute = compute;
    use_effect(deps, move || {
        effect_state.set(effect_compute());
        || {}
    });

    state
}

/// Bookkeeping of which hook slots on a component are computed values, for introspection
/// (devtools, logging) — independent of the hook runtime itself, the way
/// [`minimact_hooks::TemplateStateManager`] is independent of the hint cache.
#[derive(Default)]
pub struct ComputedRegistry {
    labels: FxHashMap<(ComponentId, usize), String>,
}

impl ComputedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `component_id`'s hook slot `index` holds a computed value named `label`.
    pub fn record(&mut self, component_id: ComponentId, index: usize, label: impl Into<String>) {
        self.labels.insert((component_id, index), label.into());
    }

    /// The label recorded for a given component/slot, if any.
    pub fn label(&self, component_id: ComponentId, index: usize) -> Option<&str> {
        self.labels.get(&(component_id, index)).map(String::as_str)
    }

    /// Drop every computed-value label recorded for `component_id`.
    pub fn forget_component(&mut self, component_id: ComponentId) {
        self.labels.retain(|(cid, _), _| *cid != component_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minimact_hooks::with_hooks;

    #[test]
    fn use_computed_recomputes_only_on_dep_change() {
        let id = ComponentId(900);
        minimact_hooks::unmount(id);
        let calls = Rc::new(std::cell::RefCell::new(0));

        for dep in [1, 1, 2] {
            let calls = calls.clone();
            with_hooks(id, || {
                use_computed(dep, move || {
                    *calls.borrow_mut() += 1;
                    dep * 10
                });
            });
        }

        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn computed_registry_tracks_and_forgets_labels() {
        let mut registry = ComputedRegistry::new();
        let id = ComponentId(1);
        registry.record(id, 0, "doubled");
        assert_eq!(registry.label(id, 0), Some("doubled"));
        registry.forget_component(id);
        assert_eq!(registry.label(id, 0), None);
    }
}
