//! `useEffect`-equivalent hook: re-runs when its dependency value changes, running the
//! previous invocation's cleanup first.

use serde::Serialize;

use crate::runtime::{allocate_slot, with_cell, EffectCell};

fn canonical(deps: &impl Serialize) -> serde_json::Value {
    serde_json::to_value(deps).unwrap_or(serde_json::Value::Null)
}

/// Run `effect` whenever `deps` differs (by canonical JSON equality) from the previous
/// render's, running the prior call's returned cleanup first.
pub fn use_effect<D, F, C>(deps: D, effect: F)
where
    D: Serialize,
    F: FnOnce() -> C,
    C: FnOnce() + 'static,
{
    let deps_value = canonical(&deps);
    let (component_id, index) = allocate_slot(|| EffectCell {
        deps: serde_json::Value::Null,
        cleanup: None,
    });

    let changed = with_cell::<EffectCell, _>(component_id, index, |cell| {
        let changed = cell.deps != deps_value;
        if changed {
            if let Some(cleanup) = cell.cleanup.take() {
                cleanup();
            }
        }
        cell.deps = deps_value;
        changed
    });

    if changed {
        let cleanup = effect();
        with_cell::<EffectCell, _>(component_id, index, |cell| {
            cell.cleanup = Some(Box::new(cleanup));
        });
    }
}
