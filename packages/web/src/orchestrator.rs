//! The orchestrator (§4.L): boots and wires the transport adapter, message buffer, hint
//! cache, template state manager, pub/sub bus, and context cache, and owns the public API a
//! host application actually calls. Generic over [`PatchTarget`] so it can be driven in
//! tests against an in-memory tree and in the browser against [`crate::dom_target::WebDomTarget`].

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{instrument, warn};

use minimact_buffer::MessageBuffer;
use minimact_cache::HintQueue;
use minimact_core::{materialize_patch, Patch, PatchTarget, StateMap};
use minimact_hooks::{ArrayOp, ComponentId, TemplateStateManager};
use minimact_transport::{rpc, HubMessage, TransportAdapter, TransportEvent};

use crate::context_cache::ContextCache;
use crate::pubsub::PubSub;

/// Work the orchestrator could not finish on its own and hands back to the host: applying
/// inbound patches needs the caller's current component state (for template materialization
/// already baked into the patch by [`HintQueue::match_hint`], or supplied fresh here), and
/// stream/completion events need to be routed to whatever is awaiting that invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    /// Concrete patches to apply against the live tree.
    PatchesReady { patches: Vec<Patch> },
    /// A chunk of a streaming server task.
    StreamItem { invocation_id: String, item: Value },
    /// A server task reached a terminal state.
    Completion {
        invocation_id: String,
        result: Option<Value>,
        error: Option<String>,
    },
    /// The transport dropped; components should treat predictions as unconfirmed.
    Disconnected,
    /// The transport came back; the host should re-register every live component.
    Reconnected,
}

/// Boots and wires A–K; owns the public surface a host application drives.
pub struct Orchestrator<T: PatchTarget, A: TransportAdapter> {
    target: T,
    adapter: A,
    buffer: MessageBuffer,
    hints: HintQueue,
    templates: TemplateStateManager,
    pubsub: PubSub,
    contexts: ContextCache,
    was_connected: bool,
}

impl<T: PatchTarget, A: TransportAdapter> Orchestrator<T, A> {
    pub fn new(target: T, adapter: A) -> Self {
        let was_connected = adapter.is_connected();
        Orchestrator {
            target,
            adapter,
            buffer: MessageBuffer::new(),
            hints: HintQueue::new(),
            templates: TemplateStateManager::new(),
            pubsub: PubSub::new(),
            contexts: ContextCache::new(),
            was_connected,
        }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn pubsub(&self) -> &PubSub {
        &self.pubsub
    }

    pub fn contexts(&mut self) -> &mut ContextCache {
        &mut self.contexts
    }

    pub fn templates(&mut self) -> &mut TemplateStateManager {
        &mut self.templates
    }

    /// Materialize any template patches against `state` and apply everything to the live tree.
    #[instrument(skip(self, patches, state))]
    pub fn apply_patches(
        &mut self,
        patches: &[Patch],
        state: &StateMap,
    ) -> Result<(), minimact_core::PatchError> {
        for patch in patches {
            let concrete = if patch.is_template() {
                materialize_patch(patch, state)?
            } else {
                vec![patch.clone()]
            };
            for patch in &concrete {
                self.target.apply_patch(patch);
            }
        }
        Ok(())
    }

    /// Apply a speculative prediction immediately, ahead of server confirmation. Identical
    /// mechanically to [`Self::apply_patches`]; kept as a distinct name to match the call site
    /// in `dispatch_state_change`/the hub message handler, where the two mean different things.
    pub fn apply_prediction(
        &mut self,
        patches: &[Patch],
        state: &StateMap,
    ) -> Result<(), minimact_core::PatchError> {
        self.apply_patches(patches, state)
    }

    /// Apply a corrective patch set sent by the server to reconcile a misprediction.
    pub fn apply_correction(
        &mut self,
        patches: &[Patch],
        state: &StateMap,
    ) -> Result<(), minimact_core::PatchError> {
        self.apply_patches(patches, state)
    }

    /// Record a speculative hint for a future local state change.
    pub fn queue_hint(
        &mut self,
        key: impl Into<String>,
        predicted_state: StateMap,
        patches: Vec<Patch>,
        confidence: f64,
        now_millis: u64,
    ) {
        self.hints
            .insert(key, predicted_state, patches, confidence, now_millis);
    }

    /// After a local state change, check whether a previously queued hint already predicted
    /// it; if so, apply its patches immediately and return them.
    pub fn consult_hint(
        &mut self,
        actual_state: &StateMap,
        now_millis: u64,
    ) -> Result<Option<Vec<Patch>>, minimact_cache::HintError> {
        self.hints.sweep_expired(now_millis);
        let Some(patches) = self.hints.match_hint(actual_state, now_millis)? else {
            return Ok(None);
        };
        for patch in &patches {
            self.target.apply_patch(patch);
        }
        Ok(Some(patches))
    }

    /// Re-render every template this component owns against `actual_state`, applying each
    /// result to the live tree. Templates aren't indexed by the state keys their bindings
    /// read, so every template belonging to `component_id` is re-rendered rather than just
    /// the ones touched by this particular change — step (e) of §4.F.
    fn rerender_bound_templates(&mut self, component_id: ComponentId, actual_state: &StateMap) -> Vec<Patch> {
        let mut applied = Vec::new();
        for path in self.templates.paths_for_component(component_id) {
            match self.templates.render(component_id, &path, actual_state) {
                Ok(content) => {
                    let patch = Patch::UpdateText { path, content };
                    self.target.apply_patch(&patch);
                    applied.push(patch);
                }
                Err(err) => warn!(?err, ?component_id, "failed to re-render bound template"),
            }
        }
        applied
    }

    /// The rest of the §4.F setter algorithm, picking up after a hook's `StateHandle::set`/
    /// `update` has already written the new value into its local cell (steps a-b): consult
    /// the hint cache and apply on a hit (c), re-render every template this component owns
    /// (d-e), and push the new value to the server (f).
    ///
    /// `actual_state` must reflect the component's full state *after* the local write, since
    /// both hint matching and template rendering read from it.
    pub async fn dispatch_state_change(
        &mut self,
        component_id: ComponentId,
        key: &str,
        value: Value,
        actual_state: &StateMap,
        now_millis: u64,
    ) -> Result<Vec<Patch>, DispatchError<A::Error>> {
        let mut applied = self.consult_hint(actual_state, now_millis)?.unwrap_or_default();
        applied.extend(self.rerender_bound_templates(component_id, actual_state));
        self.send(|sequence_id| {
            HubMessage::invoke(
                sequence_id,
                rpc::UPDATE_COMPONENT_STATE,
                vec![json!(component_id.0), json!(key), value],
            )
        })
        .await?;
        Ok(applied)
    }

    /// Like [`Self::dispatch_state_change`], for an [`ArrayOp`] descriptor returned by an
    /// [`minimact_hooks::ArrayHandle`] mutator: the server gets the operation itself
    /// (`UpdateComponentStateWithOperation`) rather than the whole array, so it can replay
    /// the same targeted mutation instead of diffing.
    pub async fn dispatch_array_op<T: Serialize>(
        &mut self,
        component_id: ComponentId,
        key: &str,
        op: &ArrayOp<T>,
        actual_state: &StateMap,
        now_millis: u64,
    ) -> Result<Vec<Patch>, DispatchError<A::Error>> {
        let mut applied = self.consult_hint(actual_state, now_millis)?.unwrap_or_default();
        applied.extend(self.rerender_bound_templates(component_id, actual_state));
        let op_value = serde_json::to_value(op).unwrap_or(Value::Null);
        self.send(|sequence_id| {
            HubMessage::invoke(
                sequence_id,
                rpc::UPDATE_COMPONENT_STATE_WITH_OPERATION,
                vec![json!(component_id.0), json!(key), op_value],
            )
        })
        .await?;
        Ok(applied)
    }

    /// Assign a sequence id, retain the message for resend, and hand it to the adapter.
    ///
    /// Waits for [`minimact_buffer::MessageBuffer::drain_ready`] first: once the buffer is
    /// over its high-water mark, new sends are delayed (never dropped, never failed) until
    /// acks free capacity, per §4.B's backpressure contract. The sequence id itself is only
    /// assigned after the wait, so a pending send never burns a sequence number the adapter
    /// hasn't actually transmitted yet.
    pub async fn send(&mut self, build: impl FnOnce(u64) -> HubMessage) -> Result<(), SendError<A::Error>> {
        self.buffer.drain_ready().await;
        let sequence_id = self.buffer.assign_sequence();
        let message = build(sequence_id);
        self.buffer.track_unacked(sequence_id, message.clone());
        self.adapter.send(&message).map_err(SendError::Transport)?;
        Ok(())
    }

    /// If an inbound ack is due (coalesced per [`minimact_buffer::ACK_COALESCE_MILLIS`]), send it.
    pub fn flush_pending_ack(&mut self) -> Result<(), A::Error> {
        if let Some(sequence_id) = self.buffer.take_pending_ack() {
            self.adapter.send(&HubMessage::Ack { sequence_id })?;
        }
        Ok(())
    }

    /// Drain and handle one transport event, surfacing whatever the host still needs to act on.
    #[instrument(skip(self))]
    pub fn pump(&mut self) -> Option<OrchestratorEvent> {
        match self.adapter.poll_event()? {
            TransportEvent::Message(message) => self.handle_message(message),
            TransportEvent::Disconnected => {
                self.was_connected = false;
                Some(OrchestratorEvent::Disconnected)
            }
            TransportEvent::ResendRequested { sequence_id } => {
                for message in self.buffer.resend_after(sequence_id) {
                    if let Err(err) = self.adapter.send(&message) {
                        warn!(?err, "resend failed");
                    }
                }
                None
            }
        }
    }

    fn handle_message(&mut self, message: HubMessage) -> Option<OrchestratorEvent> {
        if let Some(sequence_id) = message.sequence_id() {
            self.buffer.note_received(sequence_id);
        }

        let reconnected = !self.was_connected && self.adapter.is_connected();
        self.was_connected = self.adapter.is_connected();

        let event = match message {
            HubMessage::Ack { sequence_id } => {
                self.buffer.on_ack(sequence_id);
                None
            }
            HubMessage::Sequence { sequence_id } => {
                for resend in self.buffer.resend_after(sequence_id) {
                    if let Err(err) = self.adapter.send(&resend) {
                        warn!(?err, "resend after Sequence failed");
                    }
                }
                None
            }
            HubMessage::Ping => None,
            HubMessage::Close { error, .. } => {
                if let Some(error) = error {
                    warn!(error, "hub closed the connection");
                }
                Some(OrchestratorEvent::Disconnected)
            }
            HubMessage::Invocation {
                target, arguments, ..
            } => self.handle_invocation(&target, &arguments),
            HubMessage::StreamItem {
                invocation_id, item, ..
            } => Some(OrchestratorEvent::StreamItem { invocation_id, item }),
            HubMessage::Completion {
                invocation_id,
                result,
                error,
                ..
            } => Some(OrchestratorEvent::Completion {
                invocation_id,
                result,
                error,
            }),
            HubMessage::StreamInvocation { .. } | HubMessage::CancelInvocation { .. } => None,
        };

        if reconnected {
            return Some(OrchestratorEvent::Reconnected);
        }
        event
    }

    /// Dispatch a server-pushed named invocation (§6) by its `target` method name.
    fn handle_invocation(&mut self, target: &str, arguments: &[Value]) -> Option<OrchestratorEvent> {
        match target {
            rpc::APPLY_PATCHES | rpc::UPDATE_COMPONENT | rpc::APPLY_PREDICTION | rpc::APPLY_CORRECTION => {
                match serde_json::from_value::<Vec<Patch>>(arguments.first().cloned().unwrap_or(Value::Null)) {
                    Ok(patches) => Some(OrchestratorEvent::PatchesReady { patches }),
                    Err(err) => {
                        warn!(?err, target, "malformed patch-carrying invocation");
                        None
                    }
                }
            }
            rpc::QUEUE_HINT => {
                self.handle_queue_hint(arguments);
                None
            }
            rpc::ERROR => {
                let message = arguments.first().and_then(Value::as_str).unwrap_or("");
                warn!(message, "server pushed an Error invocation");
                None
            }
            other => {
                warn!(target = other, "unrecognized invocation target, ignoring");
                None
            }
        }
    }

    /// Decode and queue a server-pushed `QueueHint` invocation's arguments: `[key,
    /// predictedState, patches, confidence, queuedAt]` (§3 Hint Queue).
    fn handle_queue_hint(&mut self, arguments: &[Value]) {
        let Some(key) = arguments.first().and_then(Value::as_str) else {
            warn!("QueueHint missing key argument");
            return;
        };
        let predicted_state: StateMap =
            match serde_json::from_value(arguments.get(1).cloned().unwrap_or(Value::Null)) {
                Ok(state) => state,
                Err(err) => {
                    warn!(?err, "QueueHint has malformed predictedState");
                    return;
                }
            };
        let patches: Vec<Patch> =
            match serde_json::from_value(arguments.get(2).cloned().unwrap_or(Value::Null)) {
                Ok(patches) => patches,
                Err(err) => {
                    warn!(?err, "QueueHint has malformed patches");
                    return;
                }
            };
        let confidence = arguments.get(3).and_then(Value::as_f64).unwrap_or(0.0);
        let queued_at_millis = arguments.get(4).and_then(Value::as_u64).unwrap_or(0);
        self.queue_hint(key, predicted_state, patches, confidence, queued_at_millis);
    }
}

/// Failure modes of [`Orchestrator::send`]. Backpressure is no longer one of them — it
/// delays the send (via [`minimact_buffer::MessageBuffer::drain_ready`]) rather than
/// failing it.
#[derive(Debug, thiserror::Error)]
pub enum SendError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Transport(#[source] E),
}

/// Failure modes of [`Orchestrator::dispatch_state_change`]/[`Orchestrator::dispatch_array_op`].
#[derive(Debug, thiserror::Error)]
pub enum DispatchError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Hint(#[from] minimact_cache::HintError),
    #[error(transparent)]
    Send(#[from] SendError<E>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use minimact_core::nodes::VNode;
    use minimact_core::Props;
    use std::collections::HashMap;

    #[derive(Default)]
    struct TestTree {
        nodes: HashMap<usize, (String, Props)>,
        next_id: usize,
        children: HashMap<usize, Vec<usize>>,
    }

    impl TestTree {
        fn new() -> Self {
            let mut tree = TestTree::default();
            tree.next_id = 1;
            tree.children.insert(0, Vec::new());
            tree
        }
    }

    impl PatchTarget for TestTree {
        type Node = usize;

        fn root(&self) -> usize {
            0
        }

        fn child_at(&self, node: &usize, index: usize) -> Option<usize> {
            self.children.get(node)?.get(index).copied()
        }

        fn child_count(&self, node: &usize) -> usize {
            self.children.get(node).map(Vec::len).unwrap_or(0)
        }

        fn create_element(&mut self, tag: &str) -> usize {
            let id = self.next_id;
            self.next_id += 1;
            self.nodes.insert(id, (tag.to_string(), Props::new()));
            self.children.insert(id, Vec::new());
            id
        }

        fn create_text_node(&mut self, content: &str) -> usize {
            let id = self.next_id;
            self.next_id += 1;
            self.nodes.insert(id, ("#text".to_string(), {
                let mut p = Props::new();
                p.insert("content".into(), content.to_string());
                p
            }));
            self.children.insert(id, Vec::new());
            id
        }

        fn create_fragment(&mut self) -> usize {
            self.create_element("#fragment")
        }

        fn create_raw_html(&mut self, html: &str) -> usize {
            let id = self.create_element("#raw");
            self.nodes.get_mut(&id).unwrap().1.insert("html".into(), html.to_string());
            id
        }

        fn insert_child(&mut self, parent: &usize, index: usize, child: usize) {
            let kids = self.children.entry(*parent).or_default();
            let index = index.min(kids.len());
            kids.insert(index, child);
        }

        fn remove_child(&mut self, parent: &usize, child: &usize) {
            if let Some(kids) = self.children.get_mut(parent) {
                kids.retain(|c| c != child);
            }
        }

        fn set_text(&mut self, node: &usize, content: &str) {
            if let Some((_, props)) = self.nodes.get_mut(node) {
                props.insert("content".into(), content.to_string());
            }
        }

        fn current_props(&self, node: &usize) -> Props {
            self.nodes.get(node).map(|(_, p)| p.clone()).unwrap_or_default()
        }

        fn write_prop(&mut self, node: &usize, name: &str, value: &str) {
            self.nodes.entry(*node).or_insert_with(|| (String::new(), Props::new())).1
                .insert(name.to_string(), value.to_string());
        }

        fn remove_prop(&mut self, node: &usize, name: &str) {
            if let Some((_, props)) = self.nodes.get_mut(node) {
                props.remove(name);
            }
        }

        fn keyed_children(&self, _node: &usize) -> Vec<(String, usize)> {
            Vec::new()
        }

        fn move_before(&mut self, parent: &usize, node: &usize, before: Option<&usize>) {
            self.remove_child(parent, node);
            let index = match before {
                Some(b) => self.children.get(parent).and_then(|k| k.iter().position(|c| c == b)).unwrap_or(0),
                None => self.children.get(parent).map(Vec::len).unwrap_or(0),
            };
            self.insert_child(parent, index, *node);
        }
    }

    #[derive(Default)]
    struct MemoryAdapter {
        connected: bool,
        sent: Vec<HubMessage>,
        events: std::collections::VecDeque<TransportEvent>,
    }

    impl TransportAdapter for MemoryAdapter {
        type Error = std::convert::Infallible;

        fn features(&self) -> minimact_transport::TransportFeatures {
            minimact_transport::TransportFeatures::default()
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn send(&mut self, message: &HubMessage) -> Result<(), Self::Error> {
            self.sent.push(message.clone());
            Ok(())
        }

        fn poll_event(&mut self) -> Option<TransportEvent> {
            self.events.pop_front()
        }
    }

    fn adapter() -> MemoryAdapter {
        MemoryAdapter {
            connected: true,
            ..Default::default()
        }
    }

    #[test]
    fn apply_patches_creates_a_node_at_root() {
        let mut orchestrator = Orchestrator::new(TestTree::new(), adapter());
        let patches = vec![Patch::Create {
            path: vec![],
            index: 0,
            node: VNode::text("hello"),
        }];
        orchestrator.apply_patches(&patches, &StateMap::new()).unwrap();
        assert_eq!(orchestrator.target().child_count(&0), 1);
    }

    #[test]
    fn invocation_message_surfaces_as_patches_ready() {
        let mut orchestrator = Orchestrator::new(TestTree::new(), adapter());
        let message = HubMessage::apply_patches(
            1,
            vec![Patch::Create {
                path: vec![],
                index: 0,
                node: VNode::text("x"),
            }],
        );
        let event = orchestrator.handle_message(message);
        match event {
            Some(OrchestratorEvent::PatchesReady { patches }) => assert_eq!(patches.len(), 1),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn queue_hint_invocation_is_consulted_on_a_later_matching_state_change() {
        let mut orchestrator = Orchestrator::new(TestTree::new(), adapter());
        let predicted_state: StateMap = [("count".to_string(), serde_json::json!(1))]
            .into_iter()
            .collect();
        let message = HubMessage::queue_hint(
            1,
            "increment",
            serde_json::to_value(&predicted_state).unwrap(),
            vec![Patch::UpdateText {
                path: vec![0],
                content: "1".into(),
            }],
            0.9,
            0,
        );
        assert!(orchestrator.handle_message(message).is_none());

        let hit = orchestrator.consult_hint(&predicted_state, 10).unwrap();
        assert!(hit.is_some());
    }

    /// Drive a future to completion with a no-op waker, the way `minimact-buffer`'s own
    /// tests poll a `DrainReady`. Every future this crate awaits in a test resolves
    /// synchronously (nothing here is actually backpressured), so one poll always suffices.
    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        use std::task::{Context, Poll};

        futures_util::pin_mut!(fut);
        let waker = futures_util::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(value) => value,
            Poll::Pending => panic!("send() did not resolve synchronously in this test"),
        }
    }

    #[test]
    fn dispatch_state_change_rerenders_templates_and_pushes_to_server() {
        use minimact_core::{Binding, TemplatePatch};

        let mut orchestrator = Orchestrator::new(TestTree::new(), adapter());
        let component_id = ComponentId(7);
        orchestrator.templates().register(
            component_id,
            vec![0],
            TemplatePatch {
                template: "Count: {0}".into(),
                bindings: vec![Binding::Bare("count".into())],
                slots: vec![0],
                conditional_templates: None,
                conditional_binding_index: None,
            },
        );

        let state: StateMap = [("count".to_string(), serde_json::json!(5))].into_iter().collect();
        let applied = block_on(orchestrator.dispatch_state_change(
            component_id,
            "count",
            serde_json::json!(5),
            &state,
            0,
        ))
        .unwrap();

        assert_eq!(
            applied,
            vec![Patch::UpdateText {
                path: vec![0],
                content: "Count: 5".into(),
            }]
        );
        assert_eq!(orchestrator.buffer.lowest_unacked(), Some(1));
    }

    #[test]
    fn ack_message_evicts_buffer_entry() {
        let mut orchestrator = Orchestrator::new(TestTree::new(), adapter());
        block_on(orchestrator.send(|sequence_id| HubMessage::Ack { sequence_id })).unwrap();
        assert_eq!(orchestrator.buffer.lowest_unacked(), Some(1));
        orchestrator.handle_message(HubMessage::Ack { sequence_id: 1 });
        assert_eq!(orchestrator.buffer.lowest_unacked(), None);
    }
}
