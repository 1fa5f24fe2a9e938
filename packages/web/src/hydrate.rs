//! The hydrator (§3): attach behavior to server-rendered markup already sitting in the DOM
//! instead of tearing it down and rebuilding it, walking the existing tree and falling back
//! to a from-scratch rebuild only where it must — the same shape as `dioxus-web`'s own mount
//! path (`packages/web/src/lib.rs`), which attempts `WebsysDom::rehydrate` and, on mismatch,
//! logs the failure and rebuilds the DOM from scratch instead.

use tracing::warn;
use wasm_bindgen::JsCast;
use web_sys::{Element, Node};

use minimact_core::{PatchTarget, VNode};

/// Walk `existing`, matching it against `vnode` node-by-node. Returns `true` if every node
/// in `vnode` matched something already in the DOM (tag names for elements, node-type for
/// text) — the element tree can be reused as-is, with just its attributes refreshed.
/// Returns `false` as soon as a mismatch is found; the caller should then fall back to a
/// full rebuild of the mismatched subtree.
pub fn hydrate(existing: &Node, vnode: &VNode) -> bool {
    match vnode {
        VNode::Text { content } => {
            if existing.node_type() == Node::TEXT_NODE {
                existing.set_text_content(Some(content));
                true
            } else {
                false
            }
        }
        VNode::RawHtml { .. } => {
            // Trust server-rendered raw HTML verbatim; there's nothing structured to compare.
            true
        }
        VNode::Fragment { children } => hydrate_children(existing, children),
        VNode::Element {
            tag,
            props,
            children,
            ..
        } => {
            let Some(element) = existing.clone().dyn_into::<Element>().ok() else {
                return false;
            };
            if !element.tag_name().eq_ignore_ascii_case(tag) {
                return false;
            }
            for (name, value) in props {
                if name.starts_with("data-minimact-") {
                    continue;
                }
                if let Err(err) = element.set_attribute(name, value) {
                    warn!(?err, name, "hydration attribute refresh failed");
                }
            }
            hydrate_children(existing, children)
        }
    }
}

fn hydrate_children(existing: &Node, children: &[VNode]) -> bool {
    let live = existing.child_nodes();
    if live.length() as usize != children.len() {
        return false;
    }
    for (i, child_vnode) in children.iter().enumerate() {
        let Some(child_node) = live.item(i as u32) else {
            return false;
        };
        if !hydrate(&child_node, child_vnode) {
            return false;
        }
    }
    true
}

/// Attempt [`hydrate`] against `target`'s root; on mismatch, clear the root and materialize
/// `vnode` fresh via [`PatchTarget::create_node`].
pub fn hydrate_or_rebuild<T: PatchTarget<Node = Node>>(target: &mut T, vnode: &VNode) {
    let root = target.root();
    if target.child_count(&root) == 1 {
        if let Some(only_child) = target.child_at(&root, 0) {
            if hydrate(&only_child, vnode) {
                return;
            }
        }
    }

    warn!("hydration mismatch, rebuilding root from scratch");
    while target.child_count(&root) > 0 {
        if let Some(child) = target.child_at(&root, 0) {
            target.remove_child(&root, &child);
        }
    }
    let fresh = target.create_node(vnode);
    target.insert_child(&root, 0, fresh);
}
