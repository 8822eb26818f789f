use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use serde_json::Value as JsonValue;

use super::MetaKey;
use super::Node;

/// Receives change notifications from a [`super::NodeTree`].
///
/// Called after the node lock has been released, on the mutating thread.
#[cfg_attr(test, automock)]
pub trait TreeListener: Send + Sync + 'static {
    fn on_value_changed(
        &self,
        node: &Arc<Node>,
    );

    fn on_child_added(
        &self,
        child: &Arc<Node>,
    );

    fn on_child_removed(
        &self,
        child: &Arc<Node>,
    );

    /// `value` is `None` when the key was removed.
    fn on_metadata_changed(
        &self,
        node: &Arc<Node>,
        key: MetaKey,
        value: Option<JsonValue>,
    );
}
