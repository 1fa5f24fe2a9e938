//! The template state manager (§3): a persistent `(componentId, path) -> TemplatePatch` map.
//!
//! The server only ships a template the first time a node becomes template-driven; every
//! later local state change re-renders it from this registry instead of waiting on another
//! `UpdateTextTemplate`/`UpdatePropsTemplate`/`UpdateListTemplate` patch. Deliberately
//! independent of `minimact-cache`'s hint queue: a template is an exact rendering recipe,
//! not a speculative guess, so it never expires and is never subset-matched.

use rustc_hash::FxHashMap;

use minimact_core::{Path, StateMap, TemplatePatch};

use crate::error::HookError;
use crate::runtime::ComponentId;

/// Registry of templates keyed by the component and tree path they apply to.
#[derive(Default)]
pub struct TemplateStateManager {
    templates: FxHashMap<(ComponentId, Path), TemplatePatch>,
}

impl TemplateStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the template for `component_id` at `path`.
    pub fn register(&mut self, component_id: ComponentId, path: Path, template: TemplatePatch) {
        self.templates.insert((component_id, path), template);
    }

    /// The template registered for `component_id` at `path`, if any.
    pub fn get(&self, component_id: ComponentId, path: &Path) -> Option<&TemplatePatch> {
        self.templates.get(&(component_id, path.clone()))
    }

    /// Every path currently template-driven for `component_id`, in no particular order.
    /// Used to re-render every template a component owns after one of its state values
    /// changes, since a template's bindings aren't indexed by the state keys they read.
    pub fn paths_for_component(&self, component_id: ComponentId) -> Vec<Path> {
        self.templates
            .keys()
            .filter(|(cid, _)| *cid == component_id)
            .map(|(_, path)| path.clone())
            .collect()
    }

    /// Render the template registered at `(component_id, path)` against `state`.
    pub fn render(
        &self,
        component_id: ComponentId,
        path: &Path,
        state: &StateMap,
    ) -> Result<String, HookError> {
        let template = self
            .get(component_id, path)
            .ok_or_else(|| HookError::TemplateMissing {
                component_id,
                path: path.clone(),
            })?;
        Ok(template.render(state)?)
    }

    /// Drop every template registered for `component_id` (component unmounted).
    pub fn unregister_component(&mut self, component_id: ComponentId) {
        self.templates.retain(|(cid, _), _| *cid != component_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minimact_core::Binding;

    fn template(binding: &str) -> TemplatePatch {
        TemplatePatch {
            template: "Count: {0}".into(),
            bindings: vec![Binding::Bare(binding.into())],
            slots: vec![0],
            conditional_templates: None,
            conditional_binding_index: None,
        }
    }

    #[test]
    fn render_uses_registered_template_for_path() {
        let mut mgr = TemplateStateManager::new();
        let id = ComponentId(1);
        mgr.register(id, vec![0, 1], template("count"));

        let state = StateMap::from([("count".to_string(), serde_json::json!(7))]);
        assert_eq!(mgr.render(id, &vec![0, 1], &state).unwrap(), "Count: 7");
    }

    #[test]
    fn missing_template_is_reported() {
        let mgr = TemplateStateManager::new();
        let err = mgr.render(ComponentId(1), &vec![0], &StateMap::new());
        assert!(matches!(err, Err(HookError::TemplateMissing { .. })));
    }

    #[test]
    fn unregister_component_drops_only_its_templates() {
        let mut mgr = TemplateStateManager::new();
        mgr.register(ComponentId(1), vec![0], template("count"));
        mgr.register(ComponentId(2), vec![0], template("count"));
        mgr.unregister_component(ComponentId(1));
        assert!(mgr.get(ComponentId(1), &vec![0]).is_none());
        assert!(mgr.get(ComponentId(2), &vec![0]).is_some());
    }
}
