use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use tracing::debug;
use tracing::trace;

use super::node::validate_name;
use super::Node;
use super::TreeListener;
use super::Value;
use crate::NodeError;
use crate::Result;

/// Metadata slot addressed by the last path segment (`@attr` or `$config`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetaKey {
    Attribute(String),
    Config(String),
}

impl MetaKey {
    /// Key as it appears in list rows and snapshots.
    pub fn wire_name(&self) -> String {
        match self {
            MetaKey::Attribute(key) => format!("@{key}"),
            MetaKey::Config(key) => format!("${key}"),
        }
    }
}

/// In-memory node tree rooted at `/`.
///
/// Reads take per-node read locks; each mutation takes the write lock of the
/// one node it touches. The registered listener is called only after that lock
/// has been released.
pub struct NodeTree {
    root: Arc<Node>,
    listener: RwLock<Option<Arc<dyn TreeListener>>>,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    pub fn new() -> Self {
        Self {
            root: Node::new_root(),
            listener: RwLock::new(None),
        }
    }

    pub fn root(&self) -> &Arc<Node> {
        &self.root
    }

    pub fn set_listener(
        &self,
        listener: Arc<dyn TreeListener>,
    ) {
        *self.listener.write() = Some(listener);
    }

    pub fn clear_listener(&self) {
        *self.listener.write() = None;
    }

    fn notify(
        &self,
        f: impl FnOnce(&dyn TreeListener),
    ) {
        let listener = self.listener.read().clone();
        if let Some(listener) = listener {
            f(listener.as_ref());
        }
    }

    pub fn lookup(
        &self,
        path: &str,
    ) -> Option<Arc<Node>> {
        let mut current = self.root.clone();
        for segment in segments(path) {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// Resolves a request path to a node plus an optional metadata suffix.
    pub fn resolve(
        &self,
        path: &str,
    ) -> Option<(Arc<Node>, Option<MetaKey>)> {
        let parts: Vec<&str> = segments(path).collect();
        let Some((last, parent)) = parts.split_last() else {
            return Some((self.root.clone(), None));
        };

        let meta = if let Some(key) = last.strip_prefix('@') {
            Some(MetaKey::Attribute(key.to_string()))
        } else {
            last.strip_prefix('$').map(|key| MetaKey::Config(key.to_string()))
        };

        match meta {
            Some(meta) => {
                let mut current = self.root.clone();
                for segment in parent {
                    current = current.child(segment)?;
                }
                Some((current, Some(meta)))
            }
            None => self.lookup(path).map(|node| (node, None)),
        }
    }

    pub fn children(
        &self,
        node: &Arc<Node>,
    ) -> Vec<Arc<Node>> {
        node.children()
    }

    pub fn value(
        &self,
        node: &Arc<Node>,
    ) -> Option<Value> {
        node.value()
    }

    pub fn get_or_create_child(
        &self,
        parent: &Arc<Node>,
        name: &str,
    ) -> Result<Arc<Node>> {
        validate_name(name)?;
        parent.ensure_attached()?;

        let (child, created) = {
            let mut state = parent.write_state();
            match state.children.get(name) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let child = Node::new_child(parent, name);
                    state.children.insert(name.to_string(), child.clone());
                    (child, true)
                }
            }
        };

        if created {
            trace!(path = %child.path(), "node created");
            self.notify(|l| l.on_child_added(&child));
        }
        Ok(child)
    }

    /// Creates every missing node along `path` and returns the last one.
    pub fn create_path(
        &self,
        path: &str,
    ) -> Result<Arc<Node>> {
        let mut current = self.root.clone();
        for segment in segments(path) {
            current = self.get_or_create_child(&current, segment)?;
        }
        Ok(current)
    }

    pub fn set_value(
        &self,
        node: &Arc<Node>,
        value: Value,
    ) {
        let attached = {
            let mut state = node.write_state();
            state.value = Some(value);
            !state.detached
        };
        if attached {
            self.notify(|l| l.on_value_changed(node));
        }
    }

    pub fn clear_value(
        &self,
        node: &Arc<Node>,
    ) {
        let attached = {
            let mut state = node.write_state();
            state.value = None;
            !state.detached
        };
        if attached {
            self.notify(|l| l.on_value_changed(node));
        }
    }

    pub fn set_attribute(
        &self,
        node: &Arc<Node>,
        key: &str,
        value: JsonValue,
    ) {
        node.write_state().attributes.insert(key.to_string(), value.clone());
        self.notify(|l| l.on_metadata_changed(node, MetaKey::Attribute(key.to_string()), Some(value)));
    }

    pub fn remove_attribute(
        &self,
        node: &Arc<Node>,
        key: &str,
    ) -> Option<JsonValue> {
        let removed = node.write_state().attributes.shift_remove(key);
        if removed.is_some() {
            self.notify(|l| l.on_metadata_changed(node, MetaKey::Attribute(key.to_string()), None));
        }
        removed
    }

    pub fn set_config(
        &self,
        node: &Arc<Node>,
        key: &str,
        value: JsonValue,
    ) {
        node.write_state().configs.insert(key.to_string(), value.clone());
        self.notify(|l| l.on_metadata_changed(node, MetaKey::Config(key.to_string()), Some(value)));
    }

    pub fn remove_config(
        &self,
        node: &Arc<Node>,
        key: &str,
    ) -> Option<JsonValue> {
        let removed = node.write_state().configs.shift_remove(key);
        if removed.is_some() {
            self.notify(|l| l.on_metadata_changed(node, MetaKey::Config(key.to_string()), None));
        }
        removed
    }

    /// Detaches `node` and its whole subtree. The root cannot be removed.
    pub fn remove(
        &self,
        node: &Arc<Node>,
    ) -> Result<()> {
        if node.is_root() {
            return Err(NodeError::RootRemoval.into());
        }
        let parent = node.parent().ok_or_else(|| NodeError::Detached {
            path: node.path().to_string(),
        })?;

        {
            let mut state = parent.write_state();
            match state.children.get(node.name()) {
                Some(current) if Arc::ptr_eq(current, node) => {
                    state.children.shift_remove(node.name());
                }
                _ => return Err(NodeError::NotFound(node.path().to_string()).into()),
            }
        }
        node.mark_detached();

        debug!(path = %node.path(), "node removed");
        self.notify(|l| l.on_child_removed(node));
        Ok(())
    }

    /// Drops every child of the root without notifying the listener.
    pub(crate) fn reset(&self) {
        let children: Vec<Arc<Node>> = {
            let mut state = self.root.write_state();
            state.children.drain(..).map(|(_, child)| child).collect()
        };
        for child in children {
            child.mark_detached();
        }
    }
}

pub(crate) fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
