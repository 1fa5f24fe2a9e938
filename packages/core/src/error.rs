use thiserror::Error;

/// Errors raised while applying or materializing a single [`crate::patch::Patch`].
///
/// Per the patch-engine contract, these are never allowed to abort a batch: callers of
/// [`crate::patch::PatchTarget::apply_patches`] log and skip a failing patch rather than
/// propagating this type. It exists so unit tests (and `materialize_patch`, which *can*
/// fail the whole call) have something concrete to assert against.
#[derive(Debug, Error, PartialEq)]
pub enum PatchError {
    /// The path did not resolve to an existing node.
    #[error("patch target missing at path {path:?}")]
    TargetMissing {
        /// The unresolved path.
        path: Vec<usize>,
    },

    /// A VNode variant the patch target doesn't know how to materialize.
    #[error("invalid vnode")]
    InvalidVNode,

    /// A template transform name outside the whitelist in §4.D.
    #[error("unknown transform: {0}")]
    UnknownTransform(String),

    /// `UpdateListTemplate`'s array binding did not resolve to a JSON array.
    #[error("array binding {0:?} is not an array")]
    NotAnArray(String),
}
