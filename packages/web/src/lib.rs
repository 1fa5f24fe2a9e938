//! The browser runtime for minimact: wires the patch engine, transport, buffer, hint cache,
//! hook runtime, and server-task crates to a real `web-sys` DOM.
//!
//! This crate owns everything platform-specific — the DOM target, event delegation,
//! hydration, and a `WebSocket`-backed transport adapter — while the reactive logic itself
//! lives in the platform-agnostic crates it re-exports alongside its own pieces.

pub mod computed;
pub mod context_cache;
pub mod dom_target;
pub mod error;
pub mod event_delegation;
pub mod hydrate;
pub mod orchestrator;
pub mod pubsub;
pub mod websocket_adapter;

pub use computed::{use_computed, ComputedRegistry};
pub use context_cache::{ContextCache, ContextScope, ContextWrite};
pub use dom_target::WebDomTarget;
pub use error::WebError;
pub use event_delegation::{DelegatedEvent, EventDelegation, EventRegistry, DEFAULT_DELEGATED_EVENTS};
pub use hydrate::{hydrate, hydrate_or_rebuild};
pub use orchestrator::{DispatchError, Orchestrator, OrchestratorEvent, SendError};
pub use pubsub::{PubSub, SubscriptionId};
pub use websocket_adapter::WebSocketAdapter;

// Every other crate in the workspace, re-exported so a host application needs only
// `minimact-web` as a dependency.
pub use minimact_buffer::{MessageBuffer, ACK_COALESCE_MILLIS, DEFAULT_HIGH_WATER_MARK};
pub use minimact_cache::{HintQueue, DEFAULT_HINT_TTL_MILLIS};
pub use minimact_core::{
    diff_props, materialize_patch, render_template, Patch, PatchError, PatchTarget, Props,
    StateMap, VNode,
};
pub use minimact_hooks::{
    use_effect, use_ref, use_state, ArrayHandle, ArrayOp, ComponentId, RefHandle, StateHandle,
    TemplateStateManager,
};
pub use minimact_tasks::{PaginatedTasks, ServerReducer, ServerTask, StreamingTask, TaskStatus};
pub use minimact_transport::{rpc, HubMessage, TransportAdapter, TransportEvent, TransportFeatures};

/// Install `console_error_panic_hook` and a `tracing-wasm` subscriber. Call once at startup
/// before touching anything else in this crate.
pub fn init_panic_and_logging() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}
