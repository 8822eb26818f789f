use std::sync::Arc;

use chrono::Utc;
use indexmap::IndexMap;
use serde_json::Map as JsonMap;
use serde_json::Value as JsonValue;

use super::encoder::PASSWORD_KEY;
use super::encoder::TIMESTAMP_KEY;
use super::encoder::VALUE_KEY;
use crate::node::validate_name;
use crate::node::NodeState;
use crate::parse_timestamp;
use crate::Node;
use crate::NodeTree;
use crate::Result;
use crate::Value;
use crate::ValueData;
use crate::ValueType;
use crate::Writable;
use crate::DEFAULT_PROFILE;

/// Fully validated content of one node, built before the tree is touched.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub display_name: Option<String>,
    pub profile: String,
    pub interface: Option<String>,
    pub value_type: Option<ValueType>,
    pub writable: Writable,
    pub hidden: bool,
    pub password: Option<String>,
    pub configs: IndexMap<String, JsonValue>,
    pub ro_configs: IndexMap<String, JsonValue>,
    pub attributes: IndexMap<String, JsonValue>,
    pub value: Option<Value>,
    pub children: Vec<(String, NodeSpec)>,
}

impl Default for NodeSpec {
    fn default() -> Self {
        Self {
            display_name: None,
            profile: DEFAULT_PROFILE.to_string(),
            interface: None,
            value_type: None,
            writable: Writable::Never,
            hidden: false,
            password: None,
            configs: IndexMap::new(),
            ro_configs: IndexMap::new(),
            attributes: IndexMap::new(),
            value: None,
            children: Vec::new(),
        }
    }
}

/// Phase one: parse and validate the whole document.
pub fn decode_document(bytes: &[u8]) -> std::result::Result<NodeSpec, String> {
    let doc: JsonValue = serde_json::from_slice(bytes).map_err(|e| format!("invalid JSON: {e}"))?;
    match doc {
        JsonValue::Object(map) => decode_node("/", &map),
        _ => Err("document root is not an object".into()),
    }
}

fn decode_node(
    path: &str,
    map: &JsonMap<String, JsonValue>,
) -> std::result::Result<NodeSpec, String> {
    let mut content = NodeSpec::default();
    let mut value_data = None;
    let mut timestamp = None;

    for (key, raw) in map {
        let invalid = |what: &str| format!("{path}: {key} {what}");
        if key == PASSWORD_KEY {
            content.password = Some(as_string(raw).ok_or_else(|| invalid("must be a string"))?);
        } else if let Some(secret) = key.strip_prefix("$$") {
            content.ro_configs.insert(secret.to_string(), raw.clone());
        } else if let Some(config) = key.strip_prefix('$') {
            match config {
                "is" => content.profile = as_string(raw).ok_or_else(|| invalid("must be a string"))?,
                "name" => content.display_name = Some(as_string(raw).ok_or_else(|| invalid("must be a string"))?),
                "interface" => content.interface = Some(as_string(raw).ok_or_else(|| invalid("must be a string"))?),
                "type" => {
                    let text = as_string(raw).ok_or_else(|| invalid("must be a string"))?;
                    content.value_type = Some(text.parse().map_err(|e: String| invalid(&e))?);
                }
                "writable" => {
                    let text = as_string(raw).ok_or_else(|| invalid("must be a string"))?;
                    content.writable = text.parse().map_err(|e: String| invalid(&e))?;
                }
                "hidden" => content.hidden = raw.as_bool().ok_or_else(|| invalid("must be a bool"))?,
                other => {
                    content.configs.insert(other.to_string(), raw.clone());
                }
            }
        } else if let Some(attribute) = key.strip_prefix('@') {
            content.attributes.insert(attribute.to_string(), raw.clone());
        } else if key == VALUE_KEY {
            value_data = ValueData::from_json(raw);
        } else if key == TIMESTAMP_KEY {
            let text = as_string(raw).ok_or_else(|| invalid("must be a string"))?;
            timestamp = Some(parse_timestamp(&text).ok_or_else(|| invalid("is not an RFC 3339 timestamp"))?);
        } else if key.starts_with('?') {
            return Err(invalid("is not a known key"));
        } else {
            validate_name(key).map_err(|e| format!("{path}: {e}"))?;
            let JsonValue::Object(child) = raw else {
                return Err(invalid("must be an object"));
            };
            let child_path = crate::child_path(path, key);
            content.children.push((key.clone(), decode_node(&child_path, child)?));
        }
    }

    content.value = value_data.map(|data| Value::new(data, timestamp.unwrap_or_else(Utc::now)));
    Ok(content)
}

fn as_string(raw: &JsonValue) -> Option<String> {
    raw.as_str().map(str::to_string)
}

/// Phase two: replace everything under the root with the decoded nodes.
pub fn apply_to_tree(
    tree: &NodeTree,
    content: NodeSpec,
) -> Result<()> {
    tree.reset();
    apply_node(tree, tree.root(), content)
}

fn apply_node(
    tree: &NodeTree,
    node: &Arc<Node>,
    content: NodeSpec,
) -> Result<()> {
    {
        let mut state = node.write_state();
        let NodeState {
            display_name,
            profile,
            interface,
            value_type,
            value,
            writable,
            hidden,
            password,
            configs,
            ro_configs,
            attributes,
            ..
        } = &mut *state;
        *display_name = content.display_name;
        *profile = content.profile;
        *interface = content.interface;
        *value_type = content.value_type;
        *value = content.value;
        *writable = content.writable;
        *hidden = content.hidden;
        *password = content.password;
        *configs = content.configs;
        *ro_configs = content.ro_configs;
        *attributes = content.attributes;
    }
    for (name, child_content) in content.children {
        let child = tree.get_or_create_child(node, &name)?;
        apply_node(tree, &child, child_content)?;
    }
    Ok(())
}
