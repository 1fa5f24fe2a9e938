//! `ServerReducer<State, Action>` (§3): an optimistic local reducer whose state is
//! eventually reconciled against the server's authoritative result for the same action.

use std::collections::VecDeque;

/// A reducer that applies actions optimistically and reconciles against the server.
pub struct ServerReducer<S, A> {
    state: S,
    next_action_id: u64,
    pending: VecDeque<(u64, A)>,
}

impl<S: Clone, A> ServerReducer<S, A> {
    pub fn new(initial: S) -> Self {
        ServerReducer {
            state: initial,
            next_action_id: 1,
            pending: VecDeque::new(),
        }
    }

    /// The current (possibly optimistic) state.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Apply `action` locally via `reduce`, recording it as pending server confirmation.
    /// Returns the id to correlate with a later [`Self::reconcile`] call.
    pub fn dispatch(&mut self, action: A, reduce: impl FnOnce(&S, &A) -> S) -> u64 {
        let action_id = self.next_action_id;
        self.next_action_id += 1;
        self.state = reduce(&self.state, &action);
        self.pending.push_back((action_id, action));
        action_id
    }

    /// Adopt the server's authoritative state for everything up to and including
    /// `acked_action_id`, dropping those actions from the pending queue.
    pub fn reconcile(&mut self, acked_action_id: u64, authoritative_state: S) {
        self.pending.retain(|(id, _)| *id > acked_action_id);
        self.state = authoritative_state;
    }

    /// Actions applied locally but not yet confirmed by the server, oldest first.
    pub fn pending_actions(&self) -> impl Iterator<Item = &A> {
        self.pending.iter().map(|(_, action)| action)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
