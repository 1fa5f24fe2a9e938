//! Array-setter semantic helpers (§3 Hook Runtime): targeted mutations over a
//! `StateHandle<Vec<T>>`, each returning a descriptor of what it did so the caller can
//! forward the same intent to the server (or feed it to the hint cache) instead of diffing
//! the whole array afterward. Like [`crate::use_state`], these only touch the local cell;
//! `Orchestrator::dispatch_array_op` in `minimact-web` forwards the returned [`ArrayOp`] on
//! to the hint cache, template re-render, and the server.

use serde::{Deserialize, Serialize};

use crate::runtime::ComponentId;
use crate::use_state::StateHandle;

/// What an [`ArrayHandle`] operation did, independent of how it was expressed. Serializable
/// so it can be forwarded verbatim as the operation descriptor argument of an
/// `UpdateComponentStateWithOperation` invocation instead of shipping the whole array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayOp<T> {
    Append(T),
    Prepend(T),
    InsertAt { index: usize, value: T },
    RemoveAt { index: usize },
    UpdateAt { index: usize, value: T },
    Clear,
    RemoveWhere,
    UpdateWhere,
    AppendMany(Vec<T>),
    RemoveMany { indices: Vec<usize> },
}

/// A [`StateHandle`] over a `Vec<T>`, with ergonomic, intent-preserving mutators.
pub struct ArrayHandle<T> {
    state: StateHandle<Vec<T>>,
}

impl<T: Clone + 'static> ArrayHandle<T> {
    /// Wrap an existing array-valued state handle.
    pub fn new(state: StateHandle<Vec<T>>) -> Self {
        ArrayHandle { state }
    }

    /// The handle's current value.
    pub fn get(&self) -> Vec<T> {
        self.state.get()
    }

    /// The component this handle's underlying array belongs to.
    pub fn component_id(&self) -> ComponentId {
        self.state.component_id()
    }

    pub fn append(&self, value: T) -> ArrayOp<T> {
        self.state.update(|v| v.push(value.clone()));
        ArrayOp::Append(value)
    }

    pub fn prepend(&self, value: T) -> ArrayOp<T> {
        self.state.update(|v| v.insert(0, value.clone()));
        ArrayOp::Prepend(value)
    }

    pub fn insert_at(&self, index: usize, value: T) -> ArrayOp<T> {
        self.state.update(|v| {
            let index = index.min(v.len());
            v.insert(index, value.clone());
        });
        ArrayOp::InsertAt { index, value }
    }

    pub fn remove_at(&self, index: usize) -> ArrayOp<T> {
        self.state.update(|v| {
            if index < v.len() {
                v.remove(index);
            }
        });
        ArrayOp::RemoveAt { index }
    }

    pub fn update_at(&self, index: usize, value: T) -> ArrayOp<T> {
        self.state.update(|v| {
            if let Some(slot) = v.get_mut(index) {
                *slot = value.clone();
            }
        });
        ArrayOp::UpdateAt { index, value }
    }

    pub fn clear(&self) -> ArrayOp<T> {
        self.state.update(|v| v.clear());
        ArrayOp::Clear
    }

    pub fn remove_where(&self, predicate: impl Fn(&T) -> bool) -> ArrayOp<T> {
        self.state.update(|v| v.retain(|item| !predicate(item)));
        ArrayOp::RemoveWhere
    }

    pub fn update_where(&self, predicate: impl Fn(&T) -> bool, mut update: impl FnMut(&mut T)) -> ArrayOp<T> {
        self.state.update(|v| {
            for item in v.iter_mut() {
                if predicate(item) {
                    update(item);
                }
            }
        });
        ArrayOp::UpdateWhere
    }

    pub fn append_many(&self, values: Vec<T>) -> ArrayOp<T> {
        self.state.update(|v| v.extend(values.clone()));
        ArrayOp::AppendMany(values)
    }

    /// Remove every element at the given indices, in any order, without shifting the
    /// removal of one index out from under another.
    pub fn remove_many(&self, indices: &[usize]) -> ArrayOp<T> {
        let mut descending = indices.to_vec();
        descending.sort_unstable_by(|a, b| b.cmp(a));
        descending.dedup();
        self.state.update(|v| {
            for &index in &descending {
                if index < v.len() {
                    v.remove(index);
                }
            }
        });
        ArrayOp::RemoveMany {
            indices: indices.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{unmount, with_hooks, ComponentId};
    use crate::use_state::use_state;

    fn handle(id: ComponentId) -> ArrayHandle<i32> {
        unmount(id);
        ArrayHandle::new(with_hooks(id, || use_state(|| vec![10, 20, 30])))
    }

    #[test]
    fn append_and_prepend() {
        let h = handle(ComponentId(400));
        h.append(40);
        h.prepend(0);
        assert_eq!(h.get(), vec![0, 10, 20, 30, 40]);
    }

    #[test]
    fn remove_many_does_not_shift_other_removals() {
        let h = handle(ComponentId(401));
        h.append(40);
        h.append(50);
        // remove index 1 (20) and 3 (40)
        h.remove_many(&[1, 3]);
        assert_eq!(h.get(), vec![10, 30, 50]);
    }

    #[test]
    fn update_where_mutates_matching_elements_only() {
        let h = handle(ComponentId(402));
        h.update_where(|v| *v >= 20, |v| *v *= 10);
        assert_eq!(h.get(), vec![10, 200, 300]);
    }

    #[test]
    fn remove_where_drops_matching_elements() {
        let h = handle(ComponentId(403));
        h.remove_where(|v| *v == 20);
        assert_eq!(h.get(), vec![10, 30]);
    }
}
