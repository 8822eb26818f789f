use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use parking_lot::RwLock;
use prometheus::IntGauge;
use serde_json::json;
use serde_json::Value as JsonValue;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::BiIndex;
use super::Conflict;
use super::ListStream;
use crate::metrics::ACTIVE_VALUE_SUBSCRIPTIONS;
use crate::metrics::VALUE_PUSHES_TOTAL;
use crate::protocol::PUSH_RID;
use crate::LinkHandle;
use crate::MetaKey;
use crate::Node;
use crate::Response;
use crate::ResponseBatch;
use crate::Result;
use crate::Rid;
use crate::Sid;
use crate::StreamState;
use crate::SubscriptionError;

#[derive(Default)]
struct IndexState {
    /// node path <-> sid
    values: BiIndex<String, Sid>,
    /// node path -> open list stream
    paths: HashMap<String, Arc<ListStream>>,
}

/// Value and path subscriptions of one connection.
///
/// Every operation runs under a single mutex, so pushes for the same sid
/// leave in the order their updates were posted.
pub struct SubscriptionIndex {
    link: RwLock<LinkHandle>,
    inner: Mutex<IndexState>,
    /// Tracks installed value subscriptions, changed under `inner`
    active: IntGauge,
}

impl Default for SubscriptionIndex {
    fn default() -> Self {
        Self::new(LinkHandle::detached())
    }
}

impl SubscriptionIndex {
    pub fn new(link: LinkHandle) -> Self {
        Self::with_gauge(link, ACTIVE_VALUE_SUBSCRIPTIONS.clone())
    }

    /// Reports the number of value subscriptions to `active` instead of the
    /// process-wide gauge.
    pub fn with_gauge(
        link: LinkHandle,
        active: IntGauge,
    ) -> Self {
        Self {
            link: RwLock::new(link),
            inner: Mutex::new(IndexState::default()),
            active,
        }
    }

    /// Attaches the index to a (new) connection.
    pub fn bind(
        &self,
        link: LinkHandle,
    ) {
        *self.link.write() = link;
    }

    pub fn link(&self) -> LinkHandle {
        self.link.read().clone()
    }

    pub fn has_value_sub(
        &self,
        node: &Node,
    ) -> bool {
        self.inner.lock().values.contains_left(&node.path().to_string())
    }

    pub fn has_path_sub(
        &self,
        node: &Node,
    ) -> bool {
        self.inner.lock().paths.contains_key(node.path())
    }

    pub fn value_sub_count(&self) -> usize {
        self.inner.lock().values.len()
    }

    pub fn sid_of(
        &self,
        node: &Node,
    ) -> Option<Sid> {
        self.inner.lock().values.get_by_left(&node.path().to_string()).copied()
    }

    /// Installs `node <-> sid` and pushes the node's current value.
    ///
    /// Fails without touching the index when either side is already bound.
    pub fn add_value_sub(
        &self,
        node: &Node,
        sid: Sid,
    ) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.values.insert(node.path().to_string(), sid) {
            Ok(()) => {}
            Err(Conflict::Left(existing)) => {
                return Err(SubscriptionError::NodeAlreadySubscribed {
                    path: node.path().to_string(),
                    sid: existing,
                }
                .into());
            }
            Err(Conflict::Right(path)) => {
                return Err(SubscriptionError::SidInUse { sid, path }.into());
            }
        }
        self.active.inc();
        debug!(path = %node.path(), sid, "value subscription added");

        self.push_value(sid, node);
        Ok(())
    }

    pub fn remove_value_sub_by_sid(
        &self,
        sid: Sid,
    ) -> bool {
        let mut inner = self.inner.lock();
        let removed = inner.values.remove_by_right(&sid);
        if let Some(path) = &removed {
            self.active.dec();
            debug!(%path, sid, "value subscription removed");
        }
        removed.is_some()
    }

    pub fn remove_value_sub_by_node(
        &self,
        node: &Node,
    ) -> bool {
        let mut inner = self.inner.lock();
        let removed = inner.values.remove_by_left(&node.path().to_string());
        if let Some(sid) = removed {
            self.active.dec();
            debug!(path = %node.path(), sid, "value subscription removed");
        }
        removed.is_some()
    }

    pub fn path_sub_rid(
        &self,
        node: &Node,
    ) -> Option<Rid> {
        self.inner.lock().paths.get(node.path()).map(|stream| stream.rid())
    }

    /// Installs the list stream of `node`, returning the one it displaced.
    pub fn add_path_sub(
        &self,
        node: &Node,
        stream: Arc<ListStream>,
    ) -> Option<Arc<ListStream>> {
        self.inner.lock().paths.insert(node.path().to_string(), stream)
    }

    /// Removes the list stream of `node` and closes the streams of its direct
    /// children.
    pub fn remove_path_sub(
        &self,
        node: &Node,
    ) -> Option<Arc<ListStream>> {
        let mut inner = self.inner.lock();
        let removed = inner.paths.remove(node.path());
        for child in node.children() {
            if let Some(stream) = inner.paths.remove(child.path()) {
                stream.close();
            }
        }
        removed
    }

    /// Forwards an added or removed child to the parent's list stream.
    pub fn post_child_update(
        &self,
        child: &Node,
        removed: bool,
    ) {
        let Some(parent) = child.parent() else {
            return;
        };
        let inner = self.inner.lock();
        if let Some(stream) = inner.paths.get(parent.path()) {
            stream.child_update(child, removed);
        }
    }

    pub fn post_metadata_update(
        &self,
        node: &Node,
        key: &MetaKey,
        value: Option<&JsonValue>,
    ) {
        let inner = self.inner.lock();
        if let Some(stream) = inner.paths.get(node.path()) {
            stream.metadata_update(key, value);
        }
    }

    /// Pushes the node's current value if it has a value subscription.
    pub fn post_value_update(
        &self,
        node: &Node,
    ) {
        let inner = self.inner.lock();
        if let Some(sid) = inner.values.get_by_left(&node.path().to_string()) {
            self.push_value(*sid, node);
        }
    }

    /// Drops every subscription on a removed subtree and closes its list streams.
    pub fn detach_subtree(
        &self,
        node: &Node,
    ) -> usize {
        let mut inner = self.inner.lock();
        let mut detached = 0;
        for path in node.subtree_paths() {
            if inner.values.remove_by_left(&path).is_some() {
                self.active.dec();
                detached += 1;
            }
            if let Some(stream) = inner.paths.remove(&path) {
                stream.close();
                detached += 1;
            }
        }
        if detached > 0 {
            debug!(path = %node.path(), detached, "subscriptions detached with removed subtree");
        }
        detached
    }

    /// Drops everything on connection teardown. Streams are marked closed
    /// without writing, the remote side is gone.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let values = inner.values.len();
        self.active.sub(values as i64);
        inner.values.clear();
        for (_, stream) in inner.paths.drain() {
            stream.mark_closed();
        }
    }

    /// Writes `[sid, value, ts]` (or `[sid, null]`) as an unsolicited update.
    /// Must be called with the index lock held.
    fn push_value(
        &self,
        sid: Sid,
        node: &Node,
    ) {
        let row = match node.value() {
            Some(value) => json!([sid, value.to_json(), value.timestamp_string()]),
            None => json!([sid, JsonValue::Null]),
        };
        let batch = ResponseBatch::single(Response::new(PUSH_RID, StreamState::Initialized).with_updates(vec![row]));

        let link = self.link.read().clone();
        match link.write(&batch) {
            Ok(()) => {
                trace!(path = %node.path(), sid, "value pushed");
                VALUE_PUSHES_TOTAL.with_label_values(&["ok"]).inc();
            }
            Err(e) => {
                warn!(path = %node.path(), sid, error = %e, "value push failed");
                VALUE_PUSHES_TOTAL.with_label_values(&["failed"]).inc();
            }
        }
    }
}
