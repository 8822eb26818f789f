//! Wiring between the node tree, the subscription index of the current
//! connection, the responder and the snapshot dirty flag.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tracing::debug;
use tracing::info;

use crate::config::ResponderConfig;
use crate::Connection;
use crate::MetaKey;
use crate::Node;
use crate::NodeTree;
use crate::Responder;
use crate::ResponseWriter;
use crate::Result;
use crate::Rid;
use crate::SubscriptionIndex;
use crate::SystemError;
use crate::TreeListener;

/// Forwards tree changes to the subscription index and marks the snapshot dirty.
struct LinkSink {
    subscriptions: Arc<SubscriptionIndex>,
    dirty: Option<Arc<AtomicBool>>,
}

impl LinkSink {
    fn touch(&self) {
        if let Some(dirty) = &self.dirty {
            dirty.store(true, Ordering::Release);
        }
    }
}

impl TreeListener for LinkSink {
    fn on_value_changed(
        &self,
        node: &Arc<Node>,
    ) {
        self.subscriptions.post_value_update(node);
        self.touch();
    }

    fn on_child_added(
        &self,
        child: &Arc<Node>,
    ) {
        self.subscriptions.post_child_update(child, false);
        self.touch();
    }

    fn on_child_removed(
        &self,
        child: &Arc<Node>,
    ) {
        self.subscriptions.post_child_update(child, true);
        self.subscriptions.detach_subtree(child);
        self.touch();
    }

    fn on_metadata_changed(
        &self,
        node: &Arc<Node>,
        key: MetaKey,
        value: Option<JsonValue>,
    ) {
        self.subscriptions.post_metadata_update(node, &key, value.as_ref());
        self.touch();
    }
}

/// One responder endpoint serving a node tree to at most one remote peer at a
/// time.
///
/// Creating a link registers it as the tree's listener, replacing any
/// previous one. Dropping it disconnects and unregisters.
pub struct Link {
    tree: Arc<NodeTree>,
    subscriptions: Arc<SubscriptionIndex>,
    responder: Responder,
    current: Mutex<Option<Arc<Connection>>>,
}

impl Link {
    /// `dirty` is raised on every tree change, usually
    /// [`crate::SnapshotManager::dirty_flag`].
    pub fn new(
        tree: Arc<NodeTree>,
        config: ResponderConfig,
        dirty: Option<Arc<AtomicBool>>,
    ) -> Self {
        let subscriptions = Arc::new(SubscriptionIndex::default());
        tree.set_listener(Arc::new(LinkSink {
            subscriptions: subscriptions.clone(),
            dirty,
        }));
        let responder = Responder::new(tree.clone(), subscriptions.clone(), config);
        Self {
            tree,
            subscriptions,
            responder,
            current: Mutex::new(None),
        }
    }

    pub fn tree(&self) -> &Arc<NodeTree> {
        &self.tree
    }

    pub fn subscriptions(&self) -> &Arc<SubscriptionIndex> {
        &self.subscriptions
    }

    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    pub fn connection(&self) -> Option<Arc<Connection>> {
        self.current.lock().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Attaches a new peer. An existing connection is torn down first.
    pub fn connect(
        &self,
        writer: impl ResponseWriter,
    ) -> Arc<Connection> {
        let conn = Connection::new(writer);
        let previous = self.current.lock().replace(conn.clone());
        if let Some(previous) = previous {
            debug!(connection_id = previous.id(), "replacing connection");
            self.responder.disconnect(&previous);
        }
        self.subscriptions.bind(conn.handle());
        info!(connection_id = conn.id(), "peer connected");
        conn
    }

    /// Tears the current connection down. Returns false when nothing was
    /// connected.
    pub fn disconnect(&self) -> bool {
        let Some(conn) = self.current.lock().take() else {
            return false;
        };
        self.responder.disconnect(&conn);
        info!(connection_id = conn.id(), "peer disconnected");
        true
    }

    /// Handles one request batch of the current peer.
    pub fn handle(
        &self,
        requests: Vec<JsonValue>,
    ) -> Result<()> {
        let conn = self.connection().ok_or(SystemError::LinkClosed)?;
        let result = self.responder.handle(&conn, requests);
        if let Err(e) = &result {
            if e.is_link_closed() {
                self.disconnect();
            }
        }
        result
    }

    /// Closes a tracked stream of the current peer from the responder side.
    pub fn close_stream(
        &self,
        rid: Rid,
    ) -> Result<()> {
        let conn = self.connection().ok_or(SystemError::LinkClosed)?;
        self.responder.close_stream(&conn, rid)
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.disconnect();
        self.tree.clear_listener();
    }
}
