//! The concrete [`PatchTarget`] implementation backing the real DOM.
//!
//! Grounded on the teacher's `WriteMutations` implementors (dioxus-web's `WebsysDom`): a
//! thin layer translating each primitive into the matching `web-sys` call, leaving all
//! tree-walking and diffing logic to `minimact-core`'s default trait methods.

use tracing::warn;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Node, Text};

use minimact_core::{PatchTarget, Props};

/// A [`PatchTarget`] over a live `web-sys` document, rooted at a single mount element.
pub struct WebDomTarget {
    document: Document,
    root: Node,
}

impl WebDomTarget {
    /// Mount at `root`, which becomes the tree's root node (its existing children, if any,
    /// are left untouched until the first patch touches them — see `hydrate`).
    pub fn new(document: Document, root: Element) -> Self {
        WebDomTarget {
            document,
            root: root.into(),
        }
    }

    fn as_element(node: &Node) -> Option<Element> {
        node.clone().dyn_into::<Element>().ok()
    }
}

impl PatchTarget for WebDomTarget {
    type Node = Node;

    fn root(&self) -> Self::Node {
        self.root.clone()
    }

    fn child_at(&self, node: &Self::Node, index: usize) -> Option<Self::Node> {
        node.child_nodes().item(index as u32)
    }

    fn child_count(&self, node: &Self::Node) -> usize {
        node.child_nodes().length() as usize
    }

    fn create_element(&mut self, tag: &str) -> Self::Node {
        self.document
            .create_element(tag)
            .unwrap_or_else(|_| panic!("failed to create <{tag}>"))
            .into()
    }

    fn create_text_node(&mut self, content: &str) -> Self::Node {
        let text: Text = self.document.create_text_node(content);
        text.into()
    }

    fn create_fragment(&mut self) -> Self::Node {
        self.document
            .create_document_fragment()
            .into()
    }

    fn create_raw_html(&mut self, html: &str) -> Self::Node {
        let container = self
            .document
            .create_element("div")
            .expect("failed to create raw-html container");
        container.set_inner_html(html);
        container.into()
    }

    fn insert_child(&mut self, parent: &Self::Node, index: usize, child: Self::Node) {
        let reference = parent.child_nodes().item(index as u32);
        if let Err(err) = parent.insert_before(&child, reference.as_ref()) {
            warn!(?err, "insert_child failed");
        }
    }

    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node) {
        if parent.remove_child(child).is_err() {
            warn!("remove_child failed: node was not a child of parent");
        }
    }

    fn set_text(&mut self, node: &Self::Node, content: &str) {
        node.set_text_content(Some(content));
    }

    fn current_props(&self, node: &Self::Node) -> Props {
        let mut props = Props::new();
        let Some(element) = Self::as_element(node) else {
            return props;
        };
        let attrs = element.attributes();
        for i in 0..attrs.length() {
            if let Some(attr) = attrs.item(i) {
                props.insert(attr.name(), attr.value());
            }
        }
        props
    }

    fn write_prop(&mut self, node: &Self::Node, name: &str, value: &str) {
        let Some(element) = Self::as_element(node) else {
            return;
        };
        if let Err(err) = element.set_attribute(name, value) {
            warn!(?err, name, "write_prop failed");
        }
    }

    fn remove_prop(&mut self, node: &Self::Node, name: &str) {
        let Some(element) = Self::as_element(node) else {
            return;
        };
        if let Err(err) = element.remove_attribute(name) {
            warn!(?err, name, "remove_prop failed");
        }
    }

    fn keyed_children(&self, node: &Self::Node) -> Vec<(String, Self::Node)> {
        let children = node.child_nodes();
        let mut out = Vec::new();
        for i in 0..children.length() {
            let Some(child) = children.item(i) else {
                continue;
            };
            let Some(element) = Self::as_element(&child) else {
                continue;
            };
            let key = element
                .get_attribute("data-key")
                .or_else(|| element.get_attribute("key"));
            if let Some(key) = key {
                out.push((key, child));
            }
        }
        out
    }

    fn move_before(&mut self, parent: &Self::Node, node: &Self::Node, before: Option<&Self::Node>) {
        if let Err(err) = parent.insert_before(node, before) {
            warn!(?err, "move_before failed");
        }
    }
}
