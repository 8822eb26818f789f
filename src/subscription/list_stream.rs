use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::json;
use serde_json::Value as JsonValue;
use tracing::debug;
use tracing::warn;

use crate::LinkHandle;
use crate::MetaKey;
use crate::Node;
use crate::Response;
use crate::ResponseBatch;
use crate::Rid;
use crate::StreamState;
use crate::Writable;

/// Open `list` request receiving the child-set and metadata changes of one node.
#[derive(Debug)]
pub struct ListStream {
    rid: Rid,
    node_path: String,
    link: LinkHandle,
    closed: AtomicBool,
}

impl ListStream {
    pub fn new(
        rid: Rid,
        node: &Node,
        link: LinkHandle,
    ) -> Arc<Self> {
        Arc::new(Self {
            rid,
            node_path: node.path().to_string(),
            link,
            closed: AtomicBool::new(false),
        })
    }

    pub fn rid(&self) -> Rid {
        self.rid
    }

    pub fn node_path(&self) -> &str {
        &self.node_path
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Rows describing the node as it is now: metadata, configs, attributes
    /// and visible children.
    pub fn initial_updates(node: &Node) -> Vec<JsonValue> {
        let mut rows = Vec::new();
        let children = {
            let state = node.read_state();
            rows.push(json!(["$is", state.profile]));
            if let Some(name) = &state.display_name {
                rows.push(json!(["$name", name]));
            }
            if let Some(value_type) = state.value_type {
                rows.push(json!(["$type", value_type.as_str()]));
            }
            if state.writable != Writable::Never {
                rows.push(json!(["$writable", state.writable.as_str()]));
            }
            if let Some(interface) = &state.interface {
                rows.push(json!(["$interface", interface]));
            }
            if state.hidden {
                rows.push(json!(["$hidden", true]));
            }
            if let Some(action) = &state.action {
                rows.push(json!(["$invokable", action.permission().as_str()]));
                rows.push(json!(["$params", action.params_json()]));
                rows.push(json!(["$columns", action.columns_json()]));
                rows.push(json!(["$result", action.result_type().as_str()]));
            }
            for (key, value) in &state.configs {
                rows.push(json!([format!("${key}"), value]));
            }
            for (key, value) in &state.attributes {
                rows.push(json!([format!("@{key}"), value]));
            }
            state.children.values().cloned().collect::<Vec<_>>()
        };

        for child in children {
            if !child.hidden() {
                rows.push(json!([child.name(), child.summary()]));
            }
        }
        rows
    }

    pub fn child_update(
        &self,
        child: &Node,
        removed: bool,
    ) {
        let row = if removed {
            json!({ "name": child.name(), "change": "remove" })
        } else if child.hidden() {
            return;
        } else {
            json!([child.name(), child.summary()])
        };
        self.send(vec![row]);
    }

    pub fn metadata_update(
        &self,
        key: &MetaKey,
        value: Option<&JsonValue>,
    ) {
        let row = match value {
            Some(value) => json!([key.wire_name(), value]),
            None => json!({ "name": key.wire_name(), "change": "remove" }),
        };
        self.send(vec![row]);
    }

    fn send(
        &self,
        updates: Vec<JsonValue>,
    ) {
        if self.is_closed() {
            return;
        }
        let batch = ResponseBatch::single(Response::new(self.rid, StreamState::Open).with_updates(updates));
        if let Err(e) = self.link.write(&batch) {
            warn!(rid = self.rid, path = %self.node_path, error = %e, "list update not delivered");
        }
    }

    /// Marks the stream closed without telling the remote side.
    /// Returns `true` for the first call only.
    pub fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Untracks the rid and sends the closing response. Idempotent.
    pub fn close(&self) -> bool {
        if !self.mark_closed() {
            return false;
        }
        debug!(rid = self.rid, path = %self.node_path, "close list stream");
        let Ok(conn) = self.link.upgrade() else {
            return true;
        };
        if conn.tracker().untrack(self.rid) {
            if let Err(e) = conn.write(&ResponseBatch::single(Response::closed(self.rid))) {
                warn!(rid = self.rid, error = %e, "closing response not delivered");
            }
        }
        true
    }
}
