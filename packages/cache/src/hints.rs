//! The speculative hint cache (§3 Hint Queue): when a local state change looks like one
//! the server already told the client how to predict, apply the cached patches immediately
//! instead of waiting on a round trip.
//!
//! Timestamps are passed in explicitly as epoch milliseconds rather than read from a clock
//! here — `minimact-cache` has no opinion on which clock (`std::time::Instant` isn't
//! available on `wasm32-unknown-unknown`; `minimact-web` reads `Date.now()`) the caller
//! uses, and explicit timestamps keep this module trivially testable.

use std::collections::BTreeMap;

use tracing::{instrument, trace};

use minimact_core::{materialize_patch, Patch, StateMap};

use crate::error::HintError;

/// Default time-to-live for a cached hint, per §3 ("TTL <= 5s").
pub const DEFAULT_HINT_TTL_MILLIS: u64 = 5_000;

/// One speculative prediction: "if local state comes to look like `predicted_state` (on the
/// keys it mentions), these are the patches the server would have sent."
#[derive(Debug, Clone, PartialEq)]
pub struct Hint {
    /// The subset of state this hint's prediction depends on.
    pub predicted_state: StateMap,
    /// The patches to apply on a match. May include template patches, materialized
    /// against `predicted_state` lazily by [`HintQueue::match_hint`].
    pub patches: Vec<Patch>,
    /// The server's confidence in this prediction, in `[0, 1]`.
    pub confidence: f64,
    inserted_at_millis: u64,
}

/// A keyed, TTL-bounded store of [`Hint`]s.
pub struct HintQueue {
    ttl_millis: u64,
    hints: BTreeMap<String, Hint>,
}

impl HintQueue {
    /// A queue using the default 5-second TTL.
    pub fn new() -> Self {
        Self::with_ttl_millis(DEFAULT_HINT_TTL_MILLIS)
    }

    /// A queue with a custom TTL, mainly for tests.
    pub fn with_ttl_millis(ttl_millis: u64) -> Self {
        HintQueue {
            ttl_millis,
            hints: BTreeMap::new(),
        }
    }

    /// Insert or replace the hint stored under `key`. `confidence` is clamped to `[0, 1]`.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        predicted_state: StateMap,
        patches: Vec<Patch>,
        confidence: f64,
        now_millis: u64,
    ) {
        self.hints.insert(
            key.into(),
            Hint {
                predicted_state,
                patches,
                confidence: confidence.clamp(0.0, 1.0),
                inserted_at_millis: now_millis,
            },
        );
    }

    /// Drop every hint whose TTL has elapsed as of `now_millis`.
    #[instrument(skip(self))]
    pub fn sweep_expired(&mut self, now_millis: u64) {
        let ttl = self.ttl_millis;
        let before = self.hints.len();
        self.hints
            .retain(|_, hint| now_millis.saturating_sub(hint.inserted_at_millis) < ttl);
        let dropped = before - self.hints.len();
        if dropped > 0 {
            trace!(dropped, "swept expired hints");
        }
    }

    /// How many live (non-swept) hints are currently cached.
    pub fn len(&self) -> usize {
        self.hints.len()
    }

    /// Whether the queue holds no hints.
    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }

    /// Find a non-expired hint whose `predicted_state` is a subset of `actual_state` — every
    /// key the hint mentions has the same canonical value in `actual_state` — and return its
    /// materialized patches. A matched hint is removed from the queue: it is consumed on
    /// first use and never replayed against a later, independent state change.
    ///
    /// `serde_json::Value`'s `PartialEq` is already canonical (objects compare by key/value
    /// regardless of insertion order, since the `preserve_order` feature isn't enabled), so
    /// the subset check is a direct equality comparison per key.
    #[instrument(skip(self, actual_state))]
    pub fn match_hint(
        &mut self,
        actual_state: &StateMap,
        now_millis: u64,
    ) -> Result<Option<Vec<Patch>>, HintError> {
        let ttl_millis = self.ttl_millis;
        let matched_key = self.hints.iter().find_map(|(key, hint)| {
            let expired = now_millis.saturating_sub(hint.inserted_at_millis) >= ttl_millis;
            if !expired && is_subset(&hint.predicted_state, actual_state) {
                Some(key.clone())
            } else {
                None
            }
        });

        let Some(key) = matched_key else {
            return Ok(None);
        };
        let hint = self.hints.remove(&key).expect("key was just located");

        let mut materialized = Vec::with_capacity(hint.patches.len());
        for patch in &hint.patches {
            if patch.is_template() {
                let rendered = materialize_patch(patch, &hint.predicted_state)
                    .map_err(|source| HintError::Materialize {
                        key: key.clone(),
                        source,
                    })?;
                materialized.extend(rendered);
            } else {
                materialized.push(patch.clone());
            }
        }
        trace!(key, "hint cache hit, removed from queue");
        Ok(Some(materialized))
    }

    /// Remove and return the hint stored under `key`, if any.
    pub fn take(&mut self, key: &str) -> Option<Hint> {
        self.hints.remove(key)
    }
}

impl Default for HintQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn is_subset(predicted: &StateMap, actual: &StateMap) -> bool {
    predicted
        .iter()
        .all(|(key, value)| actual.get(key) == Some(value))
}
