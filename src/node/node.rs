use std::sync::Arc;
use std::sync::Weak;

use indexmap::IndexMap;
use parking_lot::RwLock;
use parking_lot::RwLockReadGuard;
use parking_lot::RwLockWriteGuard;
use serde_json::Map as JsonMap;
use serde_json::Value as JsonValue;

use super::Action;
use super::Value;
use super::ValueType;
use super::Writable;
use crate::NodeError;
use crate::Result;

pub const ROOT_PATH: &str = "/";
pub const DEFAULT_PROFILE: &str = "node";

/// Mutable part of a node, guarded by the node's own lock.
#[derive(Debug)]
pub(crate) struct NodeState {
    pub(crate) display_name: Option<String>,
    pub(crate) profile: String,
    pub(crate) interface: Option<String>,
    pub(crate) value_type: Option<ValueType>,
    pub(crate) value: Option<Value>,
    pub(crate) writable: Writable,
    pub(crate) hidden: bool,
    pub(crate) password: Option<String>,
    pub(crate) configs: IndexMap<String, JsonValue>,
    pub(crate) ro_configs: IndexMap<String, JsonValue>,
    pub(crate) attributes: IndexMap<String, JsonValue>,
    pub(crate) children: IndexMap<String, Arc<Node>>,
    pub(crate) action: Option<Action>,
    pub(crate) detached: bool,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            display_name: None,
            profile: DEFAULT_PROFILE.to_string(),
            interface: None,
            value_type: None,
            value: None,
            writable: Writable::Never,
            hidden: false,
            password: None,
            configs: IndexMap::new(),
            ro_configs: IndexMap::new(),
            attributes: IndexMap::new(),
            children: IndexMap::new(),
            action: None,
            detached: false,
        }
    }
}

/// One addressable entry of the tree.
///
/// Name, path and parent never change after creation. Everything else sits
/// behind a per-node reader/writer lock. Structural and value mutations that
/// must be observed by subscribers go through [`super::NodeTree`]; the plain
/// setters here are for building nodes before they are published.
#[derive(Debug)]
pub struct Node {
    name: String,
    path: String,
    parent: Weak<Node>,
    state: RwLock<NodeState>,
}

impl Node {
    pub(crate) fn new_root() -> Arc<Self> {
        Arc::new(Self {
            name: String::new(),
            path: ROOT_PATH.to_string(),
            parent: Weak::new(),
            state: RwLock::new(NodeState::default()),
        })
    }

    pub(crate) fn new_child(
        parent: &Arc<Node>,
        name: &str,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            path: child_path(&parent.path, name),
            parent: Arc::downgrade(parent),
            state: RwLock::new(NodeState::default()),
        })
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, NodeState> {
        self.state.read()
    }

    pub(crate) fn write_state(&self) -> RwLockWriteGuard<'_, NodeState> {
        self.state.write()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path == ROOT_PATH
    }

    pub fn parent(&self) -> Option<Arc<Node>> {
        self.parent.upgrade()
    }

    pub fn is_detached(&self) -> bool {
        self.state.read().detached
    }

    pub fn display_name(&self) -> Option<String> {
        self.state.read().display_name.clone()
    }

    pub fn set_display_name(
        &self,
        name: impl Into<String>,
    ) {
        self.state.write().display_name = Some(name.into());
    }

    pub fn profile(&self) -> String {
        self.state.read().profile.clone()
    }

    pub fn set_profile(
        &self,
        profile: impl Into<String>,
    ) {
        self.state.write().profile = profile.into();
    }

    pub fn interface(&self) -> Option<String> {
        self.state.read().interface.clone()
    }

    pub fn set_interface(
        &self,
        interface: impl Into<String>,
    ) {
        self.state.write().interface = Some(interface.into());
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.state.read().value_type
    }

    pub fn set_value_type(
        &self,
        value_type: ValueType,
    ) {
        self.state.write().value_type = Some(value_type);
    }

    pub fn value(&self) -> Option<Value> {
        self.state.read().value.clone()
    }

    pub fn writable(&self) -> Writable {
        self.state.read().writable
    }

    pub fn set_writable(
        &self,
        writable: Writable,
    ) {
        self.state.write().writable = writable;
    }

    pub fn hidden(&self) -> bool {
        self.state.read().hidden
    }

    pub fn set_hidden(
        &self,
        hidden: bool,
    ) {
        self.state.write().hidden = hidden;
    }

    pub fn password(&self) -> Option<String> {
        self.state.read().password.clone()
    }

    pub fn set_password(
        &self,
        password: impl Into<String>,
    ) {
        self.state.write().password = Some(password.into());
    }

    pub fn config(
        &self,
        key: &str,
    ) -> Option<JsonValue> {
        self.state.read().configs.get(key).cloned()
    }

    pub fn configs(&self) -> IndexMap<String, JsonValue> {
        self.state.read().configs.clone()
    }

    pub fn ro_config(
        &self,
        key: &str,
    ) -> Option<JsonValue> {
        self.state.read().ro_configs.get(key).cloned()
    }

    pub fn set_ro_config(
        &self,
        key: impl Into<String>,
        value: JsonValue,
    ) {
        self.state.write().ro_configs.insert(key.into(), value);
    }

    pub fn attribute(
        &self,
        key: &str,
    ) -> Option<JsonValue> {
        self.state.read().attributes.get(key).cloned()
    }

    pub fn attributes(&self) -> IndexMap<String, JsonValue> {
        self.state.read().attributes.clone()
    }

    pub fn child(
        &self,
        name: &str,
    ) -> Option<Arc<Node>> {
        self.state.read().children.get(name).cloned()
    }

    /// Children in insertion order.
    pub fn children(&self) -> Vec<Arc<Node>> {
        self.state.read().children.values().cloned().collect()
    }

    pub fn has_children(&self) -> bool {
        !self.state.read().children.is_empty()
    }

    pub fn action(&self) -> Option<Action> {
        self.state.read().action.clone()
    }

    pub fn set_action(
        &self,
        action: Action,
    ) {
        self.state.write().action = Some(action);
    }

    pub fn is_invokable(&self) -> bool {
        self.state.read().action.is_some()
    }

    /// Short description used for a child row of a list response.
    pub fn summary(&self) -> JsonMap<String, JsonValue> {
        let state = self.state.read();
        let mut summary = JsonMap::new();
        summary.insert("$is".into(), JsonValue::String(state.profile.clone()));
        if let Some(name) = &state.display_name {
            summary.insert("$name".into(), JsonValue::String(name.clone()));
        }
        if let Some(value_type) = state.value_type {
            summary.insert("$type".into(), JsonValue::String(value_type.as_str().into()));
        }
        if state.writable != Writable::Never {
            summary.insert("$writable".into(), JsonValue::String(state.writable.as_str().into()));
        }
        if let Some(interface) = &state.interface {
            summary.insert("$interface".into(), JsonValue::String(interface.clone()));
        }
        if let Some(action) = &state.action {
            summary.insert("$invokable".into(), JsonValue::String(action.permission().as_str().into()));
        }
        summary
    }

    /// Paths of this node and all its descendants, parents first.
    pub fn subtree_paths(&self) -> Vec<String> {
        let mut paths = vec![self.path.clone()];
        for child in self.children() {
            paths.extend(child.subtree_paths());
        }
        paths
    }

    pub(crate) fn mark_detached(&self) {
        let children = {
            let mut state = self.state.write();
            state.detached = true;
            state.children.values().cloned().collect::<Vec<_>>()
        };
        for child in children {
            child.mark_detached();
        }
    }

    pub(crate) fn ensure_attached(&self) -> Result<()> {
        if self.is_detached() {
            return Err(NodeError::Detached {
                path: self.path.clone(),
            }
            .into());
        }
        Ok(())
    }
}

pub fn child_path(
    parent: &str,
    name: &str,
) -> String {
    if parent == ROOT_PATH {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Names must be non-empty, free of `/` and must not start with a reserved prefix.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.starts_with(['$', '@', '?']) {
        return Err(NodeError::InvalidName(name.to_string()).into());
    }
    Ok(())
}
