use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Attribute map carried by an [`VNode::Element`] or an `UpdateProps` patch.
///
/// A `BTreeMap` keeps attribute order deterministic, which matters for the prop-diff
/// in [`crate::patch::diff_props`] and for reproducible test fixtures.
pub type Props = BTreeMap<String, String>;

/// An owned virtual node.
///
/// This mirrors the wire shape the server sends inside `Create`/`Replace` patches. It is
/// intentionally a plain owned tree (no arena, no bump allocator) since, unlike a
/// renderer-agnostic VDOM that re-diffs every render, the client here never diffs this
/// tree itself — it only ever materializes one to hand off to a [`crate::patch::PatchTarget`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VNode {
    /// A text node.
    Text {
        /// The text content of this node.
        content: String,
    },

    /// An element with a tag, attributes, and children.
    Element {
        /// The HTML tag name, e.g. `"div"`.
        tag: String,
        /// Non-reserved attributes to set on the element.
        #[serde(default)]
        props: Props,
        /// Ordered children.
        #[serde(default)]
        children: Vec<VNode>,
        /// Optional stable key, read from `data-key`/`key` for keyed reordering.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },

    /// A list of children with no wrapping element.
    Fragment {
        /// The fragment's children.
        children: Vec<VNode>,
    },

    /// Raw HTML assigned verbatim via `innerHTML`.
    RawHtml {
        /// The HTML string.
        html: String,
    },
}

impl VNode {
    /// Shorthand for a text node.
    pub fn text(content: impl Into<String>) -> Self {
        VNode::Text {
            content: content.into(),
        }
    }

    /// Shorthand for an unkeyed element with no attributes.
    pub fn element(tag: impl Into<String>, children: Vec<VNode>) -> Self {
        VNode::Element {
            tag: tag.into(),
            props: Props::new(),
            children,
            key: None,
        }
    }

    /// The node's stable key, if any. Only [`VNode::Element`] can carry one.
    pub fn key(&self) -> Option<&str> {
        match self {
            VNode::Element { key, .. } => key.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vnode_variants_roundtrip() {
        let node = VNode::Element {
            tag: "li".into(),
            props: Props::from([("class".into(), "item".into())]),
            children: vec![VNode::text("hello")],
            key: Some("a".into()),
        };
        let json = serde_json::to_string(&node).unwrap();
        let back: VNode = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);
    }
}
