//! The hook runtime: a per-component-instance stack of call-order-addressed cells.
//!
//! Grounded directly on the teacher's `runtime.rs`, which keeps a `thread_local!` stack of
//! active component contexts so nested renders (a component rendering children) push and
//! pop cleanly without threading a context parameter through every render function. Hooks
//! here are addressed by *call order within a render*, not by closure identity — the same
//! invariant React and the teacher's scope-local hook list both enforce: hooks must be
//! called unconditionally and in the same order on every render of a given component.

use std::any::Any;
use std::cell::RefCell;

use rustc_hash::FxHashMap;
use tracing::instrument;

/// Identifies a component instance whose hook state persists across renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u64);

struct ComponentState {
    cells: Vec<Box<dyn Any>>,
}

impl ComponentState {
    fn new() -> Self {
        ComponentState { cells: Vec::new() }
    }
}

struct ActiveFrame {
    component_id: ComponentId,
    cursor: usize,
}

#[derive(Default)]
struct Runtime {
    components: FxHashMap<ComponentId, ComponentState>,
    stack: Vec<ActiveFrame>,
}

thread_local! {
    static RUNTIME: RefCell<Runtime> = RefCell::new(Runtime::default());
}

/// An effect's persisted cleanup, stored type-erased so [`run_all_cleanups`] can find every
/// effect cell in a component without knowing each one's dependency type.
pub(crate) struct EffectCell {
    pub(crate) deps: serde_json::Value,
    pub(crate) cleanup: Option<Box<dyn FnOnce()>>,
}

/// Push a fresh render frame for `component_id`, run `render` with it active, then pop it.
/// Hooks called anywhere during `render` (including in nested component renders, since the
/// stack is a stack) resolve against the innermost active frame.
#[instrument(skip(render))]
pub fn with_hooks<R>(component_id: ComponentId, render: impl FnOnce() -> R) -> R {
    RUNTIME.with(|rt| {
        rt.borrow_mut().stack.push(ActiveFrame {
            component_id,
            cursor: 0,
        });
    });
    let result = render();
    let popped = RUNTIME.with(|rt| rt.borrow_mut().stack.pop());
    debug_assert!(
        popped.map(|f| f.component_id) == Some(component_id),
        "hook frame stack imbalance: pushed and popped component ids differ"
    );
    result
}

fn current_slot() -> (ComponentId, usize) {
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        let frame = rt
            .stack
            .last_mut()
            .expect("hook called outside an active with_hooks render frame");
        let index = frame.cursor;
        frame.cursor += 1;
        (frame.component_id, index)
    })
}

/// Allocate the next call-order slot for the active component, seeding it with `init()` the
/// first time this slot is reached. Returns the `(component_id, index)` address of the slot
/// so the caller can build a handle that reads/writes it outside of a render.
pub(crate) fn allocate_slot<T: 'static>(init: impl FnOnce() -> T) -> (ComponentId, usize) {
    let (component_id, index) = current_slot();
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        let state = rt
            .components
            .entry(component_id)
            .or_insert_with(ComponentState::new);
        if index == state.cells.len() {
            state.cells.push(Box::new(init()));
        } else if index > state.cells.len() {
            panic!(
                "hook order violation: component {component_id:?} reached slot {index} \
                 before slot {}",
                state.cells.len()
            );
        }
    });
    (component_id, index)
}

/// Access the cell at `(component_id, index)` as `T`, panicking if the component was
/// unmounted or the call site's type disagrees with what's stored there (a hook-order
/// violation).
pub(crate) fn with_cell<T: 'static, R>(
    component_id: ComponentId,
    index: usize,
    access: impl FnOnce(&mut T) -> R,
) -> R {
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        let state = rt
            .components
            .get_mut(&component_id)
            .unwrap_or_else(|| panic!("component {component_id:?} has no hook state"));
        let cell = state
            .cells
            .get_mut(index)
            .unwrap_or_else(|| panic!("hook slot {index} missing for component {component_id:?}"));
        let value = cell
            .downcast_mut::<T>()
            .expect("hook type mismatch: hooks must be called in the same order every render");
        access(value)
    })
}

/// Run every still-pending effect cleanup for `component_id`, without removing its other
/// hook state. Used both on unmount and, per the resolved "cleanups before re-register"
/// question, whenever a component's hook call order is about to be rebuilt from scratch.
pub fn run_all_cleanups(component_id: ComponentId) {
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        if let Some(state) = rt.components.get_mut(&component_id) {
            for cell in state.cells.iter_mut() {
                if let Some(effect) = cell.downcast_mut::<EffectCell>() {
                    if let Some(cleanup) = effect.cleanup.take() {
                        cleanup();
                    }
                }
            }
        }
    });
}

/// Run all pending cleanups and drop every hook cell for `component_id` (the component
/// unmounted).
pub fn unmount(component_id: ComponentId) {
    run_all_cleanups(component_id);
    RUNTIME.with(|rt| {
        rt.borrow_mut().components.remove(&component_id);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_slot_seeds_once_then_reuses() {
        unmount(ComponentId(1));
        let first = with_hooks(ComponentId(1), || allocate_slot(|| 10i32));
        with_cell::<i32, _>(first.0, first.1, |v| *v += 1);
        let second = with_hooks(ComponentId(1), || allocate_slot(|| 999i32));
        assert_eq!(with_cell::<i32, _>(second.0, second.1, |v| *v), 11);
    }

    #[test]
    #[should_panic(expected = "outside an active")]
    fn slot_allocation_outside_render_panics() {
        allocate_slot(|| 0i32);
    }

    #[test]
    fn unmount_clears_state_so_next_mount_reseeds() {
        unmount(ComponentId(2));
        let slot = with_hooks(ComponentId(2), || allocate_slot(|| 5i32));
        with_cell::<i32, _>(slot.0, slot.1, |v| *v = 42);
        unmount(ComponentId(2));
        let slot = with_hooks(ComponentId(2), || allocate_slot(|| 5i32));
        assert_eq!(with_cell::<i32, _>(slot.0, slot.1, |v| *v), 5);
    }
}
