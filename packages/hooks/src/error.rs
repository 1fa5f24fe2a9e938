use thiserror::Error;

use minimact_core::PatchError;

use crate::runtime::ComponentId;

/// Errors raised by the template state manager (§7.A). The hook runtime itself reports
/// misuse (wrong hook order, calling a hook outside a render) by panicking, the same way a
/// violated React-style invariant does — these are programmer errors, not recoverable ones.
#[derive(Debug, Error)]
pub enum HookError {
    /// No template is registered for this component/path pair, so it can't be re-rendered
    /// from a later state change without the server resending it.
    #[error("no template registered for component {component_id:?} at path {path:?}")]
    TemplateMissing {
        component_id: ComponentId,
        path: Vec<usize>,
    },

    /// The registered template failed to render against the given state.
    #[error("template render failed: {0}")]
    Render(#[from] PatchError),
}
