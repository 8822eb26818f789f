use std::sync::Arc;

use tracing::debug;

use super::MethodContext;
use super::MethodOutcome;
use super::MethodResult;
use super::ResponderMethod;
use crate::ListStream;
use crate::Node;
use crate::Permission;
use crate::ProtocolError;
use crate::StreamHandle;
use crate::SubscriptionIndex;

pub struct ListMethod;

impl ResponderMethod for ListMethod {
    fn name(&self) -> &'static str {
        "list"
    }

    fn execute(
        &self,
        ctx: &MethodContext<'_>,
    ) -> MethodResult {
        ctx.require(Permission::Read)?;
        let node = ctx.node_target()?.clone();
        if ctx.subscriptions.has_path_sub(&node) {
            return Err(ProtocolError::AlreadyListed(node.path().to_string()).into());
        }

        let updates = ListStream::initial_updates(&node);
        let stream = ListStream::new(ctx.request.rid, &node, ctx.conn.handle());
        let handle = Arc::new(ListStreamHandle {
            node: node.clone(),
            stream: stream.clone(),
            subscriptions: ctx.subscriptions.clone(),
        });

        // registered only after the listing is on the wire
        let subscriptions = ctx.subscriptions.clone();
        Ok(MethodOutcome::open()
            .with_updates(updates)
            .with_handle(handle)
            .after_sent(move || {
                if stream.is_closed() {
                    return;
                }
                if let Some(displaced) = subscriptions.add_path_sub(&node, stream) {
                    debug!(path = %node.path(), rid = displaced.rid(), "displaced list stream closed");
                    displaced.close();
                }
            }))
    }
}

/// Tracker entry of an open list; tears the path subscription down on close.
pub struct ListStreamHandle {
    node: Arc<Node>,
    stream: Arc<ListStream>,
    subscriptions: Arc<SubscriptionIndex>,
}

impl StreamHandle for ListStreamHandle {
    fn terminate(&self) {
        if !self.stream.mark_closed() {
            return;
        }
        if self.subscriptions.path_sub_rid(&self.node) == Some(self.stream.rid()) {
            self.subscriptions.remove_path_sub(&self.node);
        }
    }
}
