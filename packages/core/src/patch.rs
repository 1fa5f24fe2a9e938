//! Path-addressed patches and the [`PatchTarget`] trait that applies them to a live tree.
//!
//! `PatchTarget` plays the role the teacher's `WriteMutations` trait plays for dioxus: a
//! thin, platform-agnostic seam between "what changed" and "how to poke a real tree about
//! it". `minimact-web` implements it against `web-sys`; tests here implement it against a
//! plain in-memory tree so the engine can be exercised without a DOM.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace, warn};

use crate::error::PatchError;
use crate::nodes::{Props, VNode};
use crate::template::{LoopTemplate, StateMap, TemplatePatch};

/// A position in the tree, expressed as a root-to-node list of child indices.
pub type Path = Vec<usize>;

/// One wire-level mutation instruction (§3 `Patch`).
///
/// Template variants (`UpdateTextTemplate`, `UpdatePropsTemplate`, `UpdateListTemplate`)
/// are never applied directly: [`materialize_patch`] turns them into one of the concrete
/// variants before [`PatchTarget::apply_patch`] ever sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Patch {
    /// Insert `node` as a new child of the node at `path`, at `index`.
    Create { path: Path, index: usize, node: VNode },
    /// Remove the node at `path`.
    Remove { path: Path },
    /// Replace the node at `path` with `node`.
    Replace { path: Path, node: VNode },
    /// Set the text content of the text node at `path`.
    UpdateText { path: Path, content: String },
    /// Apply an attribute diff to the element at `path`.
    UpdateProps { path: Path, props: Props },
    /// Reorder the keyed children of the element at `path` to match `order`, an ordered
    /// list of `data-key` values. Keys in `order` with no matching child are ignored;
    /// current keyed children whose key is absent from `order` are left in place.
    ReorderChildren { path: Path, order: Vec<String> },

    /// Materializes to an `UpdateText` once rendered against local state.
    UpdateTextTemplate {
        path: Path,
        template: TemplatePatch,
    },
    /// Materializes to an `UpdateProps` once rendered against local state.
    UpdatePropsTemplate {
        path: Path,
        templates: FxHashMap<String, TemplatePatch>,
    },
    /// Materializes to a `Replace` (with a fresh `Fragment`) once rendered against local
    /// state.
    UpdateListTemplate { path: Path, template: LoopTemplate },
}

impl Patch {
    /// The path this patch targets.
    pub fn path(&self) -> &Path {
        match self {
            Patch::Create { path, .. }
            | Patch::Remove { path }
            | Patch::Replace { path, .. }
            | Patch::UpdateText { path, .. }
            | Patch::UpdateProps { path, .. }
            | Patch::ReorderChildren { path, .. }
            | Patch::UpdateTextTemplate { path, .. }
            | Patch::UpdatePropsTemplate { path, .. }
            | Patch::UpdateListTemplate { path, .. } => path,
        }
    }

    /// Whether this variant requires [`materialize_patch`] before it can be applied.
    pub fn is_template(&self) -> bool {
        matches!(
            self,
            Patch::UpdateTextTemplate { .. }
                | Patch::UpdatePropsTemplate { .. }
                | Patch::UpdateListTemplate { .. }
        )
    }
}

/// Render a template patch against `state`, producing the concrete patch to apply.
///
/// Per the patch-engine contract (§7.A), a materialization failure (e.g. an `array_binding`
/// that isn't a JSON array) fails the whole call rather than being silently skipped — unlike
/// [`PatchTarget::apply_patches`], which skips individual bad patches but never errors.
#[instrument(skip(state), fields(path = ?patch.path()))]
pub fn materialize_patch(patch: &Patch, state: &StateMap) -> Result<Vec<Patch>, PatchError> {
    match patch {
        Patch::UpdateTextTemplate { path, template } => Ok(vec![Patch::UpdateText {
            path: path.clone(),
            content: template.render(state)?,
        }]),
        Patch::UpdatePropsTemplate { path, templates } => {
            let mut props = Props::new();
            for (name, tp) in templates {
                props.insert(name.clone(), tp.render(state)?);
            }
            Ok(vec![Patch::UpdateProps {
                path: path.clone(),
                props,
            }])
        }
        Patch::UpdateListTemplate { path, template } => {
            let items = template.render(state)?;
            Ok(items
                .into_iter()
                .enumerate()
                .map(|(index, node)| Patch::Create {
                    path: path.clone(),
                    index,
                    node,
                })
                .collect())
        }
        concrete => Ok(vec![concrete.clone()]),
    }
}

/// The result of diffing two [`Props`] maps (§4.B): attributes to set/overwrite and
/// attributes to remove outright.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropsDiff {
    pub set: Props,
    pub remove: Vec<String>,
}

/// Diff `current` against `next`. Attributes present in `next` but differing (or absent)
/// from `current` are staged into `set`; attributes present in `current` but absent from
/// `next` are staged into `remove`.
///
/// `data-minimact-*` attributes are bookkeeping the client itself owns (hydration markers,
/// hint-cache tags) and are never touched here, in either direction.
pub fn diff_props(current: &Props, next: &Props) -> PropsDiff {
    let mut diff = PropsDiff::default();

    for (name, value) in next {
        if name.starts_with("data-minimact-") {
            continue;
        }
        if current.get(name) != Some(value) {
            diff.set.insert(name.clone(), value.clone());
        }
    }

    for name in current.keys() {
        if name.starts_with("data-minimact-") {
            continue;
        }
        if !next.contains_key(name) {
            diff.remove.push(name.clone());
        }
    }

    diff
}

/// The seam between the patch engine and a real tree.
///
/// Implementors supply the handful of primitive operations a concrete tree needs
/// (`minimact-web`'s is backed by `web-sys::Node`); the default methods on this trait —
/// `apply_patch`, `apply_patches`, `create_node`, `resolve_path` — are the actual patch
/// engine and are shared by every implementation.
pub trait PatchTarget {
    /// A handle to a node in the implementor's tree (an index, an `Rc<Node>`, …).
    type Node: Clone;

    /// The tree's root node.
    fn root(&self) -> Self::Node;
    /// The `index`-th child of `node`, if any.
    fn child_at(&self, node: &Self::Node, index: usize) -> Option<Self::Node>;
    /// How many children `node` has.
    fn child_count(&self, node: &Self::Node) -> usize;

    /// Create a detached element node.
    fn create_element(&mut self, tag: &str) -> Self::Node;
    /// Create a detached text node.
    fn create_text_node(&mut self, content: &str) -> Self::Node;
    /// Create a detached fragment (a childless grouping node children attach under).
    fn create_fragment(&mut self) -> Self::Node;
    /// Create a detached node whose subtree is set via `innerHTML`-equivalent assignment.
    fn create_raw_html(&mut self, html: &str) -> Self::Node;

    /// Insert `child` under `parent` at `index`.
    fn insert_child(&mut self, parent: &Self::Node, index: usize, child: Self::Node);
    /// Remove `child` from `parent`.
    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node);
    /// Overwrite a text node's content.
    fn set_text(&mut self, node: &Self::Node, content: &str);

    /// The element's current attribute set, for diffing against an incoming `UpdateProps`.
    fn current_props(&self, node: &Self::Node) -> Props;
    /// Set (or overwrite) a single attribute.
    fn write_prop(&mut self, node: &Self::Node, name: &str, value: &str);
    /// Remove a single attribute.
    fn remove_prop(&mut self, node: &Self::Node, name: &str);

    /// The keyed children of `node`, in current order, as `(key, node)` pairs. Children
    /// without a key are excluded — `ReorderChildren` only ever targets keyed elements.
    fn keyed_children(&self, node: &Self::Node) -> Vec<(String, Self::Node)>;
    /// Move `node` so it immediately precedes `before` (or to the end, if `before` is
    /// `None`) among its siblings under `parent`.
    fn move_before(&mut self, parent: &Self::Node, node: &Self::Node, before: Option<&Self::Node>);

    /// Recursively materialize a [`VNode`] into a detached node of this tree.
    fn create_node(&mut self, vnode: &VNode) -> Self::Node {
        match vnode {
            VNode::Text { content } => self.create_text_node(content),
            VNode::RawHtml { html } => self.create_raw_html(html),
            VNode::Fragment { children } => {
                let frag = self.create_fragment();
                for (i, child) in children.iter().enumerate() {
                    let child_node = self.create_node(child);
                    self.insert_child(&frag, i, child_node);
                }
                frag
            }
            VNode::Element {
                tag,
                props,
                children,
                ..
            } => {
                let el = self.create_element(tag);
                for (name, value) in props {
                    self.write_prop(&el, name, value);
                }
                for (i, child) in children.iter().enumerate() {
                    let child_node = self.create_node(child);
                    self.insert_child(&el, i, child_node);
                }
                el
            }
        }
    }

    /// Diff `node`'s current attributes against `next` and apply the result.
    fn apply_props(&mut self, node: &Self::Node, next: &Props) {
        let current = self.current_props(node);
        let diff = diff_props(&current, next);
        for name in &diff.remove {
            self.remove_prop(node, name);
        }
        for (name, value) in &diff.set {
            self.write_prop(node, name, value);
        }
    }

    /// Walk `path` from the root, returning the addressed node if every step resolves.
    fn resolve_path(&self, path: &Path) -> Option<Self::Node> {
        let mut node = self.root();
        for &index in path {
            node = self.child_at(&node, index)?;
        }
        Some(node)
    }

    /// Reorder `node`'s keyed children to match `order`, an ordered list of `data-key`
    /// values (§3 `ReorderChildren`). A key in `order` with no matching current child is
    /// ignored; a current keyed child whose key doesn't appear in `order` is left in place,
    /// untouched, at its current position.
    fn reorder_children(&mut self, node: &Self::Node, order: &[String]) {
        let current = self.keyed_children(node);
        let mut by_key: FxHashMap<String, Self::Node> = current.into_iter().collect();

        let mut ordered = Vec::with_capacity(order.len());
        for key in order {
            if let Some(child) = by_key.remove(key) {
                ordered.push(child);
            }
        }

        let mut prev: Option<Self::Node> = None;
        for child in ordered.into_iter().rev() {
            self.move_before(node, &child, prev.as_ref());
            prev = Some(child);
        }
    }

    /// Apply a single already-materialized [`Patch`]. A patch that targets a path which
    /// doesn't resolve is logged and dropped — per the patch-engine contract, one bad
    /// patch never aborts the batch.
    #[instrument(skip(self, patch), fields(path = ?patch.path()))]
    fn apply_patch(&mut self, patch: &Patch) {
        match patch {
            Patch::Create { path, index, node } => {
                let Some(parent) = self.resolve_path(path) else {
                    warn!("Create target missing, dropping patch");
                    return;
                };
                let child = self.create_node(node);
                self.insert_child(&parent, *index, child);
            }
            Patch::Remove { path } => {
                let Some((parent_path, _)) = split_path(path) else {
                    warn!("Remove targets the root, dropping patch");
                    return;
                };
                let (Some(parent), Some(target)) =
                    (self.resolve_path(&parent_path), self.resolve_path(path))
                else {
                    warn!("Remove target missing, dropping patch");
                    return;
                };
                self.remove_child(&parent, &target);
            }
            Patch::Replace { path, node } => {
                let Some((parent_path, index)) = split_path(path) else {
                    warn!("Replace targets the root, dropping patch");
                    return;
                };
                let (Some(parent), Some(old)) =
                    (self.resolve_path(&parent_path), self.resolve_path(path))
                else {
                    warn!("Replace target missing, dropping patch");
                    return;
                };
                let new_node = self.create_node(node);
                self.remove_child(&parent, &old);
                self.insert_child(&parent, index, new_node);
            }
            Patch::UpdateText { path, content } => {
                let Some(target) = self.resolve_path(path) else {
                    warn!("UpdateText target missing, dropping patch");
                    return;
                };
                self.set_text(&target, content);
            }
            Patch::UpdateProps { path, props } => {
                let Some(target) = self.resolve_path(path) else {
                    warn!("UpdateProps target missing, dropping patch");
                    return;
                };
                self.apply_props(&target, props);
            }
            Patch::ReorderChildren { path, order } => {
                let Some(target) = self.resolve_path(path) else {
                    warn!("ReorderChildren target missing, dropping patch");
                    return;
                };
                self.reorder_children(&target, order);
            }
            Patch::UpdateTextTemplate { .. }
            | Patch::UpdatePropsTemplate { .. }
            | Patch::UpdateListTemplate { .. } => {
                warn!("template patch reached apply_patch unmaterialized, dropping");
            }
        }
        trace!("applied patch");
    }

    /// Apply a batch of already-materialized patches in order.
    #[instrument(skip(self, patches), fields(count = patches.len()))]
    fn apply_patches(&mut self, patches: &[Patch]) {
        for patch in patches {
            self.apply_patch(patch);
        }
    }
}

fn split_path(path: &Path) -> Option<(Path, usize)> {
    let (&last, rest) = path.split_last()?;
    Some((rest.to_vec(), last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct TestNode {
        tag: Option<String>,
        text: Option<String>,
        html: Option<String>,
        props: Props,
        key: Option<String>,
        children: Vec<Rc<RefCell<TestNode>>>,
    }

    /// A tiny in-memory tree used only to exercise [`PatchTarget`]'s default methods.
    struct TestTree {
        root: Rc<RefCell<TestNode>>,
    }

    impl TestTree {
        fn new() -> Self {
            TestTree {
                root: Rc::new(RefCell::new(TestNode::default())),
            }
        }
    }

    impl PatchTarget for TestTree {
        type Node = Rc<RefCell<TestNode>>;

        fn root(&self) -> Self::Node {
            self.root.clone()
        }

        fn child_at(&self, node: &Self::Node, index: usize) -> Option<Self::Node> {
            node.borrow().children.get(index).cloned()
        }

        fn child_count(&self, node: &Self::Node) -> usize {
            node.borrow().children.len()
        }

        fn create_element(&mut self, tag: &str) -> Self::Node {
            Rc::new(RefCell::new(TestNode {
                tag: Some(tag.to_string()),
                ..Default::default()
            }))
        }

        fn create_text_node(&mut self, content: &str) -> Self::Node {
            Rc::new(RefCell::new(TestNode {
                text: Some(content.to_string()),
                ..Default::default()
            }))
        }

        fn create_fragment(&mut self) -> Self::Node {
            Rc::new(RefCell::new(TestNode::default()))
        }

        fn create_raw_html(&mut self, html: &str) -> Self::Node {
            Rc::new(RefCell::new(TestNode {
                html: Some(html.to_string()),
                ..Default::default()
            }))
        }

        fn insert_child(&mut self, parent: &Self::Node, index: usize, child: Self::Node) {
            let mut parent = parent.borrow_mut();
            let index = index.min(parent.children.len());
            parent.children.insert(index, child);
        }

        fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node) {
            parent.borrow_mut().children.retain(|c| !Rc::ptr_eq(c, child));
        }

        fn set_text(&mut self, node: &Self::Node, content: &str) {
            node.borrow_mut().text = Some(content.to_string());
        }

        fn current_props(&self, node: &Self::Node) -> Props {
            node.borrow().props.clone()
        }

        fn write_prop(&mut self, node: &Self::Node, name: &str, value: &str) {
            node.borrow_mut()
                .props
                .insert(name.to_string(), value.to_string());
        }

        fn remove_prop(&mut self, node: &Self::Node, name: &str) {
            node.borrow_mut().props.remove(name);
        }

        fn keyed_children(&self, node: &Self::Node) -> Vec<(String, Self::Node)> {
            node.borrow()
                .children
                .iter()
                .filter_map(|c| c.borrow().key.clone().map(|k| (k, c.clone())))
                .collect()
        }

        fn move_before(
            &mut self,
            parent: &Self::Node,
            node: &Self::Node,
            before: Option<&Self::Node>,
        ) {
            let mut p = parent.borrow_mut();
            p.children.retain(|c| !Rc::ptr_eq(c, node));
            let index = match before {
                Some(b) => p
                    .children
                    .iter()
                    .position(|c| Rc::ptr_eq(c, b))
                    .unwrap_or(p.children.len()),
                None => p.children.len(),
            };
            p.children.insert(index, node.clone());
        }
    }

    fn keyed_li(key: &str, text: &str) -> Rc<RefCell<TestNode>> {
        Rc::new(RefCell::new(TestNode {
            tag: Some("li".into()),
            key: Some(key.into()),
            children: vec![Rc::new(RefCell::new(TestNode {
                text: Some(text.into()),
                ..Default::default()
            }))],
            ..Default::default()
        }))
    }

    #[test]
    fn create_node_materializes_nested_tree() {
        let mut tree = TestTree::new();
        let vnode = VNode::element(
            "div",
            vec![VNode::text("hi"), VNode::element("span", vec![])],
        );
        let node = tree.create_node(&vnode);
        assert_eq!(node.borrow().tag.as_deref(), Some("div"));
        assert_eq!(node.borrow().children.len(), 2);
        assert_eq!(node.borrow().children[0].borrow().text.as_deref(), Some("hi"));
    }

    #[test]
    fn apply_patch_create_inserts_at_index() {
        let mut tree = TestTree::new();
        tree.apply_patch(&Patch::Create {
            path: vec![],
            index: 0,
            node: VNode::text("a"),
        });
        tree.apply_patch(&Patch::Create {
            path: vec![],
            index: 0,
            node: VNode::text("b"),
        });
        let root = tree.root();
        assert_eq!(tree.child_count(&root), 2);
        assert_eq!(
            tree.child_at(&root, 0).unwrap().borrow().text.as_deref(),
            Some("b")
        );
    }

    #[test]
    fn apply_patch_missing_target_is_dropped_not_panicked() {
        let mut tree = TestTree::new();
        tree.apply_patch(&Patch::UpdateText {
            path: vec![5],
            content: "no target".into(),
        });
        assert_eq!(tree.child_count(&tree.root()), 0);
    }

    #[test]
    fn diff_props_skips_data_minimact_namespace() {
        let current = Props::from([
            ("class".into(), "old".into()),
            ("data-minimact-hint".into(), "1".into()),
        ]);
        let next = Props::from([("class".into(), "new".into())]);
        let diff = diff_props(&current, &next);
        assert_eq!(diff.set.get("class").map(String::as_str), Some("new"));
        assert!(diff.remove.is_empty());
    }

    #[test]
    fn reorder_children_moves_minimal_set() {
        let mut tree = TestTree::new();
        let root = tree.root();
        tree.insert_child(&root, 0, keyed_li("a", "A"));
        tree.insert_child(&root, 1, keyed_li("b", "B"));
        tree.insert_child(&root, 2, keyed_li("c", "C"));

        // reverse order: c, b, a
        tree.reorder_children(&root, &["c".to_string(), "b".to_string(), "a".to_string()]);

        let keys: Vec<String> = tree
            .keyed_children(&root)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["c", "b", "a"]);
    }

    #[test]
    fn reorder_children_ignores_unknown_keys_and_leaves_missing_in_place() {
        let mut tree = TestTree::new();
        let root = tree.root();
        tree.insert_child(&root, 0, keyed_li("a", "A"));
        tree.insert_child(&root, 1, keyed_li("b", "B"));
        tree.insert_child(&root, 2, keyed_li("c", "C"));

        // "z" doesn't exist (ignored); "b" is never mentioned (left in place).
        tree.reorder_children(&root, &["z".to_string(), "a".to_string()]);

        let keys: Vec<String> = tree
            .keyed_children(&root)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["b", "c", "a"]);
    }

    #[test]
    fn materialize_patch_renders_text_template() {
        use crate::template::Binding;

        let state: StateMap = StateMap::from([("count".to_string(), serde_json::json!(3))]);
        let patch = Patch::UpdateTextTemplate {
            path: vec![0],
            template: TemplatePatch {
                template: "Count: {0}".into(),
                bindings: vec![Binding::Bare("count".into())],
                slots: vec![0],
                conditional_templates: None,
                conditional_binding_index: None,
            },
        };
        let materialized = materialize_patch(&patch, &state).unwrap();
        assert_eq!(
            materialized,
            vec![Patch::UpdateText {
                path: vec![0],
                content: "Count: 3".into(),
            }]
        );
    }

    #[test]
    fn materialize_patch_renders_list_template_as_one_create_per_item() {
        use crate::template::{Binding, ItemTemplate};

        let state: StateMap = StateMap::from([(
            "todos".to_string(),
            serde_json::json!([
                {"id": "a", "text": "x"},
                {"id": "b", "text": "y"},
            ]),
        )]);
        let patch = Patch::UpdateListTemplate {
            path: vec![0],
            template: LoopTemplate {
                array_binding: "todos".into(),
                index_var: None,
                item_template: ItemTemplate::Element {
                    tag: "li".into(),
                    props_templates: Default::default(),
                    children_templates: vec![ItemTemplate::Text {
                        template_patch: TemplatePatch {
                            template: "{0}".into(),
                            bindings: vec![Binding::Bare("item.text".into())],
                            slots: vec![0],
                            conditional_templates: None,
                            conditional_binding_index: None,
                        },
                    }],
                    key_binding: Some("item.id".into()),
                },
                key_binding: Some("item.id".into()),
            },
        };

        let materialized = materialize_patch(&patch, &state).unwrap();
        assert_eq!(
            materialized,
            vec![
                Patch::Create {
                    path: vec![0],
                    index: 0,
                    node: VNode::Element {
                        tag: "li".into(),
                        props: Default::default(),
                        children: vec![VNode::text("x")],
                        key: Some("a".into()),
                    },
                },
                Patch::Create {
                    path: vec![0],
                    index: 1,
                    node: VNode::Element {
                        tag: "li".into(),
                        props: Default::default(),
                        children: vec![VNode::text("y")],
                        key: Some("b".into()),
                    },
                },
            ]
        );
    }

    #[test]
    fn materialize_patch_propagates_not_an_array() {
        use crate::template::{ItemTemplate, LoopTemplate};

        let state: StateMap = StateMap::new();
        let patch = Patch::UpdateListTemplate {
            path: vec![0],
            template: LoopTemplate {
                array_binding: "todos".into(),
                index_var: None,
                item_template: ItemTemplate::Text {
                    template_patch: TemplatePatch {
                        template: "{0}".into(),
                        bindings: vec![],
                        slots: vec![],
                        conditional_templates: None,
                        conditional_binding_index: None,
                    },
                },
                key_binding: None,
            },
        };
        let err = materialize_patch(&patch, &state).unwrap_err();
        assert!(matches!(err, PatchError::NotAnArray(_)));
    }
}
