//! The hook runtime and template state manager for the minimact client runtime.
//!
//! `runtime` provides the call-order-addressed cell storage every hook in this crate is
//! built on; `use_state`, `use_effect`, `use_ref`, and `array_ops` are the hooks themselves;
//! `template_state` is the independent, non-expiring counterpart to `minimact-cache`'s hint
//! queue.

pub mod array_ops;
pub mod error;
pub mod runtime;
pub mod template_state;
pub mod use_effect;
pub mod use_ref;
pub mod use_state;

pub use array_ops::{ArrayHandle, ArrayOp};
pub use error::HookError;
pub use runtime::{run_all_cleanups, unmount, with_hooks, ComponentId};
pub use template_state::TemplateStateManager;
pub use use_effect::use_effect;
pub use use_ref::{use_ref, RefHandle};
pub use use_state::{use_state, StateHandle};
