use serde_json::Map as JsonMap;
use serde_json::Value as JsonValue;

use crate::Node;
use crate::NodeTree;
use crate::Writable;
use crate::DEFAULT_PROFILE;

pub(crate) const VALUE_KEY: &str = "?value";
pub(crate) const TIMESTAMP_KEY: &str = "?ts";
pub(crate) const PASSWORD_KEY: &str = "$$password";

/// Encodes the whole tree as one JSON document.
pub fn encode_tree(tree: &NodeTree) -> JsonValue {
    JsonValue::Object(encode_node(tree.root()))
}

/// Reserved config first, then secrets, configs, attributes, the value and
/// finally the children in insertion order.
pub fn encode_node(node: &Node) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();
    let children = {
        let state = node.read_state();
        if state.profile != DEFAULT_PROFILE {
            out.insert("$is".into(), JsonValue::String(state.profile.clone()));
        }
        if let Some(name) = &state.display_name {
            out.insert("$name".into(), JsonValue::String(name.clone()));
        }
        if let Some(value_type) = state.value_type {
            out.insert("$type".into(), JsonValue::String(value_type.as_str().into()));
        }
        if let Some(interface) = &state.interface {
            out.insert("$interface".into(), JsonValue::String(interface.clone()));
        }
        if state.writable != Writable::Never {
            out.insert("$writable".into(), JsonValue::String(state.writable.as_str().into()));
        }
        if state.hidden {
            out.insert("$hidden".into(), JsonValue::Bool(true));
        }
        if let Some(password) = &state.password {
            out.insert(PASSWORD_KEY.into(), JsonValue::String(password.clone()));
        }
        for (key, value) in &state.ro_configs {
            out.insert(format!("$${key}"), value.clone());
        }
        for (key, value) in &state.configs {
            out.insert(format!("${key}"), value.clone());
        }
        for (key, value) in &state.attributes {
            out.insert(format!("@{key}"), value.clone());
        }
        if let Some(value) = &state.value {
            out.insert(VALUE_KEY.into(), value.to_json());
            out.insert(TIMESTAMP_KEY.into(), JsonValue::String(value.timestamp_string()));
        }
        state.children.values().cloned().collect::<Vec<_>>()
    };

    for child in children {
        out.insert(child.name().to_string(), JsonValue::Object(encode_node(&child)));
    }
    out
}
