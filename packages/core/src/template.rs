//! Template patches and loop templates: the parameterized shapes the server sends when it
//! wants the client to fill in placeholders from local state instead of shipping a fresh
//! concrete patch for every keystroke. See spec §4.D.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PatchError;
use crate::nodes::VNode;

/// `stateKey -> value` snapshot the template renderer substitutes bindings from.
pub type StateMap = BTreeMap<String, Value>;

/// A single template binding: either a bare state key, or a state key paired with a
/// whitelisted transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Binding {
    /// `"count"` — substitute the formatted value of `state["count"]` verbatim.
    Bare(String),
    /// `{"stateKey": "count", "transform": "toFixed(2)"}`.
    WithTransform {
        #[serde(rename = "stateKey")]
        state_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transform: Option<String>,
    },
}

impl Binding {
    /// The state key this binding reads from.
    pub fn state_key(&self) -> &str {
        match self {
            Binding::Bare(k) => k,
            Binding::WithTransform { state_key, .. } => state_key,
        }
    }

    fn transform(&self) -> Option<&str> {
        match self {
            Binding::Bare(_) => None,
            Binding::WithTransform { transform, .. } => transform.as_deref(),
        }
    }

    /// Resolve and format this binding's value against `state`, applying its transform if any.
    pub fn render(&self, state: &StateMap) -> Result<String, PatchError> {
        let value = state.get(self.state_key()).cloned().unwrap_or(Value::Null);
        match self.transform() {
            Some(t) => apply_transform(&value, t),
            None => Ok(format_value(&value)),
        }
    }
}

/// `renderTemplate`'s formatting rules (§4.D): null/undefined -> `""`, strings verbatim,
/// numbers/booleans via their natural string form, arrays comma-joined, objects as
/// canonical JSON. `serde_json::Map` is backed by a `BTreeMap` (the `preserve_order`
/// feature is not enabled), so `to_string` already produces a canonically key-sorted object.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Apply one of the whitelisted transforms in §4.D to `value`. Unknown transforms are
/// rejected so the caller can warn and fall back to the raw formatted value, per spec.
pub fn apply_transform(value: &Value, transform: &str) -> Result<String, PatchError> {
    let t = transform.trim();

    if let Some(rest) = t.strip_prefix("toFixed(").and_then(|r| r.strip_suffix(')')) {
        let digits: usize = rest
            .trim()
            .parse()
            .map_err(|_| PatchError::UnknownTransform(transform.to_string()))?;
        let n = as_f64(value).ok_or_else(|| PatchError::UnknownTransform(transform.to_string()))?;
        return Ok(format!("{n:.digits$}"));
    }

    if let Some(rest) = t.strip_prefix('*') {
        let n = as_f64(value).unwrap_or(0.0);
        let factor: f64 = rest
            .trim()
            .parse()
            .map_err(|_| PatchError::UnknownTransform(transform.to_string()))?;
        return Ok(format_value(&json_number(n * factor)));
    }

    if let Some(rest) = t.strip_prefix('/') {
        let n = as_f64(value).unwrap_or(0.0);
        let divisor: f64 = rest
            .trim()
            .parse()
            .map_err(|_| PatchError::UnknownTransform(transform.to_string()))?;
        return Ok(format_value(&json_number(n / divisor)));
    }

    if let Some(rest) = t.strip_prefix('+') {
        let n = as_f64(value).unwrap_or(0.0);
        let addend: f64 = rest
            .trim()
            .parse()
            .map_err(|_| PatchError::UnknownTransform(transform.to_string()))?;
        return Ok(format_value(&json_number(n + addend)));
    }

    if let Some(rest) = t.strip_prefix('-') {
        let n = as_f64(value).unwrap_or(0.0);
        let subtrahend: f64 = rest
            .trim()
            .parse()
            .map_err(|_| PatchError::UnknownTransform(transform.to_string()))?;
        return Ok(format_value(&json_number(n - subtrahend)));
    }

    match t {
        "toUpperCase" | "toUpperCase()" => Ok(as_str(value).to_uppercase()),
        "toLowerCase" | "toLowerCase()" => Ok(as_str(value).to_lowercase()),
        "trim" | "trim()" => Ok(as_str(value).trim().to_string()),
        "!" => Ok((!is_truthy(value)).to_string()),
        _ => Err(PatchError::UnknownTransform(transform.to_string())),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => format_value(other),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

fn json_number(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// A parameterized template: a string with `{0}`, `{1}`, … placeholders, a binding per
/// placeholder, and an optional conditional variant keyed by the string form of one of the
/// bindings (§3, §4.D).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatePatch {
    /// The base template, e.g. `"Count: {0}"`.
    pub template: String,
    /// One binding per placeholder index.
    pub bindings: Vec<Binding>,
    /// Placeholder indices this template actually uses (informational; the renderer
    /// re-derives usage from `template` itself rather than trusting this list).
    #[serde(default)]
    pub slots: Vec<usize>,
    /// `String(value-of-binding[conditional_binding_index]) -> alternate template`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_templates: Option<BTreeMap<String, String>>,
    /// Index into `bindings` that selects the conditional template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_binding_index: Option<usize>,
}

impl TemplatePatch {
    /// Render this template against `state`, resolving the conditional variant first.
    pub fn render(&self, state: &StateMap) -> Result<String, PatchError> {
        let base = self.select_template(state)?;
        let mut params = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            params.push(binding.render(state)?);
        }
        Ok(render_template(&base, &params))
    }

    fn select_template(&self, state: &StateMap) -> Result<String, PatchError> {
        let (Some(templates), Some(idx)) =
            (&self.conditional_templates, self.conditional_binding_index)
        else {
            return Ok(self.template.clone());
        };
        let Some(binding) = self.bindings.get(idx) else {
            return Ok(self.template.clone());
        };
        let key = binding.render(state)?;
        match templates.get(&key) {
            Some(alt) if !alt.contains('{') => Ok(alt.clone()),
            Some(alt) => {
                // Treat as a fresh template using the same bindings.
                let mut params = Vec::with_capacity(self.bindings.len());
                for binding in &self.bindings {
                    params.push(binding.render(state)?);
                }
                Ok(render_template(alt, &params))
            }
            None => Ok(self.template.clone()),
        }
    }
}

/// Replace `{0}`, `{1}`, … in `template` with `params`, one first-occurrence substitution
/// per index (§4.D).
pub fn render_template(template: &str, params: &[String]) -> String {
    let mut out = template.to_string();
    for (i, param) in params.iter().enumerate() {
        let token = format!("{{{i}}}");
        if let Some(pos) = out.find(&token) {
            out.replace_range(pos..pos + token.len(), param);
        }
    }
    out
}

/// A template for one repeated item inside an `UpdateListTemplate` (§3 `ItemTemplate`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ItemTemplate {
    /// A plain text item.
    Text {
        /// How to render the text content.
        template_patch: TemplatePatch,
    },
    /// An element item, itself made of nested templates.
    Element {
        /// The item's tag name.
        tag: String,
        /// Per-attribute templates.
        #[serde(default)]
        props_templates: BTreeMap<String, TemplatePatch>,
        /// Nested item templates for children.
        #[serde(default)]
        children_templates: Vec<ItemTemplate>,
        /// State key (within the per-item state) that supplies the keyed-reorder key.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key_binding: Option<String>,
    },
}

impl ItemTemplate {
    fn render(&self, state: &StateMap) -> Result<VNode, PatchError> {
        match self {
            ItemTemplate::Text { template_patch } => Ok(VNode::Text {
                content: template_patch.render(state)?,
            }),
            ItemTemplate::Element {
                tag,
                props_templates,
                children_templates,
                key_binding,
            } => {
                let mut props = BTreeMap::new();
                for (name, tp) in props_templates {
                    props.insert(name.clone(), tp.render(state)?);
                }
                let mut children = Vec::with_capacity(children_templates.len());
                for child in children_templates {
                    children.push(child.render(state)?);
                }
                let key = match key_binding {
                    Some(key) => Some(format_value(
                        &state.get(key).cloned().unwrap_or(Value::Null),
                    )),
                    None => None,
                };
                Ok(VNode::Element {
                    tag: tag.clone(),
                    props,
                    children,
                    key,
                })
            }
        }
    }
}

/// A loop over an array-valued binding, rendering one [`ItemTemplate`] per element (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopTemplate {
    /// The state key holding the array to iterate.
    pub array_binding: String,
    /// Extra per-item state key exposing the numeric index, in addition to `"index"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_var: Option<String>,
    /// The template rendered once per array element.
    pub item_template: ItemTemplate,
    /// State key (within the per-item state) supplying the keyed-reorder key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_binding: Option<String>,
}

impl LoopTemplate {
    /// Render every item in `state[array_binding]` to a [`VNode`] (§4.D `renderLoopTemplate`).
    pub fn render(&self, state: &StateMap) -> Result<Vec<VNode>, PatchError> {
        let array = match state.get(&self.array_binding) {
            Some(Value::Array(items)) => items.clone(),
            _ => return Err(PatchError::NotAnArray(self.array_binding.clone())),
        };

        let mut out = Vec::with_capacity(array.len());
        for (index, item) in array.into_iter().enumerate() {
            let mut item_state = state.clone();
            item_state.insert("item".to_string(), item.clone());
            item_state.insert("index".to_string(), Value::from(index));
            if let Some(index_var) = &self.index_var {
                item_state.insert(index_var.clone(), Value::from(index));
            }
            if let Value::Object(fields) = &item {
                for (k, v) in fields {
                    item_state.insert(format!("item.{k}"), v.clone());
                }
            }
            out.push(self.item_template.render(&item_state)?);
        }
        Ok(out)
    }
}
