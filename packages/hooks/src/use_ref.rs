//! `useRef`-equivalent hook: a mutable cell that persists across renders without itself
//! needing to be `Clone` (unlike [`crate::use_state::StateHandle`]).

use crate::runtime::{allocate_slot, with_cell, ComponentId};

/// A handle to a persistent mutable cell.
#[derive(Clone, Copy)]
pub struct RefHandle<T> {
    component_id: ComponentId,
    index: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: 'static> RefHandle<T> {
    /// Borrow the cell's current value.
    pub fn with<R>(&self, read: impl FnOnce(&T) -> R) -> R {
        with_cell::<T, _>(self.component_id, self.index, |v| read(v))
    }

    /// Mutate the cell's current value.
    pub fn update(&self, mutate: impl FnOnce(&mut T)) {
        with_cell::<T, _>(self.component_id, self.index, mutate);
    }

    /// Overwrite the cell.
    pub fn set(&self, value: T) {
        self.update(move |slot| *slot = value);
    }
}

/// Register (or re-find) a ref cell for the active component, seeded with `initial()` on
/// first render. Unlike [`crate::use_state::use_state`], writing through a `RefHandle`
/// never implies the component needs to re-render.
pub fn use_ref<T: 'static>(initial: impl FnOnce() -> T) -> RefHandle<T> {
    let (component_id, index) = allocate_slot(initial);
    RefHandle {
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
    fn ref_persists_without_requiring_clone() {
        struct NotClone(u32);
        let id = ComponentId(300);
        unmount(id);

        let handle = with_hooks(id, || use_ref(|| NotClone(1)));
        handle.update(|v| v.0 += 1);

        let handle = with_hooks(id, || use_ref(|| NotClone(999)));
        assert_eq!(handle.with(|v| v.0), 2);
    }
}
