//! `useState`-equivalent hook (§3 Hook Runtime).
//!
//! `StateHandle::set`/`update` only perform the local cell write (c). The rest of the
//! setter algorithm — consulting the hint cache, re-rendering bound templates, and pushing
//! the new value to the server — needs the cache, template registry, and message buffer,
//! none of which this crate depends on. A host event handler is expected to call
//! `Orchestrator::dispatch_state_change` (in `minimact-web`) with the value this hook
//! returns; that's where the remaining steps live.

use crate::runtime::{allocate_slot, with_cell, ComponentId};

/// A handle to a single piece of state owned by a component instance.
///
/// Cheap to clone: it's just the `(component_id, slot index)` address of the underlying
/// cell, so closures (event handlers) can capture it by value and still read/write the
/// live value on a later invocation.
#[derive(Clone, Copy)]
pub struct StateHandle<T> {
    component_id: ComponentId,
    index: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: 'static> StateHandle<T> {
    /// Mutate the stored value in place. Only touches the local cell — see
    /// [`crate::use_state`] module docs for the rest of the setter algorithm (hint
    /// consultation, template re-render, server push), which lives in `minimact-web`'s
    /// `Orchestrator` since this crate has no transport/cache dependency of its own.
    pub fn update_local(&self, mutate: impl FnOnce(&mut T)) {
        with_cell::<T, _>(self.component_id, self.index, mutate);
    }

    /// Borrow the stored value for the duration of `read`.
    pub fn with<R>(&self, read: impl FnOnce(&T) -> R) -> R {
        with_cell::<T, _>(self.component_id, self.index, |v| read(v))
    }

    /// The component this handle's cell belongs to, for wiring into the rest of the
    /// setter pipeline (template re-render lookups, server push).
    pub fn component_id(&self) -> ComponentId {
        self.component_id
    }
}

impl<T: Clone + 'static> StateHandle<T> {
    /// Clone the stored value out.
    pub fn get(&self) -> T {
        self.with(|v| v.clone())
    }

    /// Mutate the stored value in place and return the resulting value, for callers that
    /// go on to push it to the server or consult the hint cache against it.
    pub fn update(&self, mutate: impl FnOnce(&mut T)) -> T {
        self.update_local(mutate);
        self.get()
    }

    /// Overwrite the stored value, returning it back.
    pub fn set(&self, value: T) -> T {
        self.update_local(|slot| *slot = value);
        self.get()
    }
}

/// Register (or re-find) a piece of state for the active component, seeded with
/// `initial()` on first render.
pub fn use_state<T: 'static>(initial: impl FnOnce() -> T) -> StateHandle<T> {
    let (component_id, index) = allocate_slot(initial);
    StateHandle {
        component_id,
        index,
        _marker: std::marker::PhantomData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{unmount, with_hooks};

    #[test]
    fn state_persists_across_renders_of_the_same_component() {
        let id = ComponentId(100);
        unmount(id);

        let handle = with_hooks(id, || use_state(|| 0i32));
        handle.set(5);

        let handle = with_hooks(id, || use_state(|| 999i32));
        assert_eq!(handle.get(), 5);
    }

    #[test]
    fn update_mutates_in_place() {
        let id = ComponentId(101);
        unmount(id);
        let handle = with_hooks(id, || use_state(|| vec![1, 2, 3]));
        handle.update(|v| v.push(4));
        assert_eq!(handle.get(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn set_and_update_return_the_new_value() {
        let id = ComponentId(102);
        unmount(id);
        let handle = with_hooks(id, || use_state(|| 0i32));
        assert_eq!(handle.set(5), 5);
        assert_eq!(handle.update(|v| *v += 1), 6);
        assert_eq!(handle.component_id(), id);
    }
}
