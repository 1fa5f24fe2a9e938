//! The context cache facade (§3 component N): named, scoped values read locally and
//! written-through to the server, the same shape as [`minimact_hooks::ArrayHandle`] — a
//! mutator returns a descriptor of what happened instead of performing IO itself, leaving the
//! orchestrator to forward it over the transport.

use rustc_hash::FxHashMap;
use serde_json::Value;

/// The lifetime a named context is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextScope {
    /// Cleared at the end of the current request/response cycle.
    Request,
    /// Persists for the duration of the connection session.
    Session,
    /// Persists for the lifetime of the page (all components on it).
    App,
    /// Derived from the current URL; changes when navigation changes the URL.
    Url,
}

/// Describes a context write that needs to be forwarded to the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextWrite {
    pub name: String,
    pub scope: ContextScope,
    pub value: Value,
}

/// A local cache of named, scoped context values. Reads are served from this cache; writes
/// update the cache immediately (optimistic, like [`minimact_tasks::ServerReducer`]) and
/// return a [`ContextWrite`] describing what the caller should push to the server.
#[derive(Default)]
pub struct ContextCache {
    values: FxHashMap<(String, ContextScope), Value>,
}

impl ContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current local value for `name` at `scope`, if any.
    pub fn get(&self, name: &str, scope: ContextScope) -> Option<&Value> {
        self.values.get(&(name.to_string(), scope))
    }

    /// Set `name` at `scope` locally and describe the write-through the caller owes the server.
    pub fn set(&mut self, name: impl Into<String>, scope: ContextScope, value: Value) -> ContextWrite {
        let name = name.into();
        self.values.insert((name.clone(), scope), value.clone());
        ContextWrite { name, scope, value }
    }

    /// Apply a value pushed down from the server, without producing a write-through (the
    /// server is the one who told us).
    pub fn adopt_from_server(&mut self, name: impl Into<String>, scope: ContextScope, value: Value) {
        self.values.insert((name.into(), scope), value);
    }

    /// Drop every context scoped to `scope` — e.g. `Request` contexts at the end of a cycle,
    /// or `Url` contexts on navigation.
    pub fn clear_scope(&mut self, scope: ContextScope) {
        self.values.retain(|(_, s), _| *s != scope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_updates_cache_and_returns_write_through() {
        let mut cache = ContextCache::new();
        let write = cache.set("theme", ContextScope::Session, json!("dark"));
        assert_eq!(write.name, "theme");
        assert_eq!(write.scope, ContextScope::Session);
        assert_eq!(cache.get("theme", ContextScope::Session), Some(&json!("dark")));
    }

    #[test]
    fn same_name_different_scope_are_independent() {
        let mut cache = ContextCache::new();
        cache.set("id", ContextScope::Url, json!(1));
        cache.set("id", ContextScope::App, json!(2));
        assert_eq!(cache.get("id", ContextScope::Url), Some(&json!(1)));
        assert_eq!(cache.get("id", ContextScope::App), Some(&json!(2)));
    }

    #[test]
    fn clear_scope_only_drops_matching_scope() {
        let mut cache = ContextCache::new();
        cache.set("a", ContextScope::Request, json!(1));
        cache.set("b", ContextScope::Session, json!(2));
        cache.clear_scope(ContextScope::Request);
        assert_eq!(cache.get("a", ContextScope::Request), None);
        assert_eq!(cache.get("b", ContextScope::Session), Some(&json!(2)));
    }

    #[test]
    fn adopt_from_server_does_not_require_a_prior_local_write() {
        let mut cache = ContextCache::new();
        cache.adopt_from_server("pushed", ContextScope::App, json!("value"));
        assert_eq!(cache.get("pushed", ContextScope::App), Some(&json!("value")));
    }
}
