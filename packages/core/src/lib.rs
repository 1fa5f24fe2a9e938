//! Data model, patch engine, and template renderer shared by every minimact client crate.
//!
//! This crate has no knowledge of transports, buffering, hooks, or the DOM — it only knows
//! how to represent a tree ([`nodes::VNode`]), describe a change to one ([`patch::Patch`]),
//! and apply that change to anything implementing [`patch::PatchTarget`].

pub mod error;
pub mod nodes;
pub mod patch;
pub mod template;

pub use error::PatchError;
pub use nodes::{Props, VNode};
pub use patch::{diff_props, materialize_patch, Patch, PatchTarget, Path, PropsDiff};
pub use template::{
    apply_transform, format_value, render_template, Binding, ItemTemplate, LoopTemplate,
    StateMap, TemplatePatch,
};
