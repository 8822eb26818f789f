use std::any::Any;
use std::collections::HashMap;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use super::CloseMethod;
use super::InvokeMethod;
use super::ListMethod;
use super::MethodContext;
use super::MethodError;
use super::MethodResult;
use super::PostSent;
use super::RemoveMethod;
use super::ResponderMethod;
use super::SetMethod;
use super::SubscribeMethod;
use super::Target;
use super::UnsubscribeMethod;
use crate::config::ResponderConfig;
use crate::metrics::DROPPED_REQUESTS_TOTAL;
use crate::metrics::REQUESTS_TOTAL;
use crate::metrics::REQUEST_ERRORS_TOTAL;
use crate::Connection;
use crate::ErrorBody;
use crate::NodeTree;
use crate::ProtocolError;
use crate::Request;
use crate::Response;
use crate::ResponseBatch;
use crate::Result;
use crate::Rid;
use crate::SubscriptionIndex;

/// Turns request batches of one connection into response batches.
pub struct Responder {
    tree: Arc<NodeTree>,
    subscriptions: Arc<SubscriptionIndex>,
    config: ResponderConfig,
    methods: HashMap<&'static str, Box<dyn ResponderMethod>>,
}

impl Responder {
    pub fn new(
        tree: Arc<NodeTree>,
        subscriptions: Arc<SubscriptionIndex>,
        config: ResponderConfig,
    ) -> Self {
        let mut responder = Self {
            tree,
            subscriptions,
            config,
            methods: HashMap::new(),
        };
        responder.register(ListMethod);
        responder.register(SetMethod);
        responder.register(RemoveMethod);
        responder.register(InvokeMethod);
        responder.register(SubscribeMethod);
        responder.register(UnsubscribeMethod);
        responder.register(CloseMethod);
        responder
    }

    /// Adds or replaces the handler for `method.name()`.
    pub fn register(
        &mut self,
        method: impl ResponderMethod,
    ) {
        self.methods.insert(method.name(), Box::new(method));
    }

    pub fn tree(&self) -> &Arc<NodeTree> {
        &self.tree
    }

    pub fn subscriptions(&self) -> &Arc<SubscriptionIndex> {
        &self.subscriptions
    }

    /// Answers every request carrying an integer rid with exactly one response,
    /// all written as a single batch.
    ///
    /// When the write fails nothing registered for after-send runs and the
    /// error is returned.
    pub fn handle(
        &self,
        conn: &Arc<Connection>,
        requests: Vec<JsonValue>,
    ) -> Result<()> {
        let mut batch = ResponseBatch::default();
        let mut post_sent: Vec<PostSent> = Vec::new();

        for raw in requests {
            let Some(request) = Request::from_json(raw) else {
                warn!(connection_id = conn.id(), "request without integer rid dropped");
                DROPPED_REQUESTS_TOTAL.inc();
                continue;
            };
            let (response, post) = self.dispatch(conn, &request);
            batch.push(response);
            post_sent.extend(post);
        }

        if batch.is_empty() {
            return Ok(());
        }
        trace!(connection_id = conn.id(), responses = batch.len(), "write response batch");
        conn.write(&batch)?;

        for f in post_sent {
            f();
        }
        Ok(())
    }

    fn dispatch(
        &self,
        conn: &Arc<Connection>,
        request: &Request,
    ) -> (Response, Option<PostSent>) {
        let rid = request.rid;

        let Some(name) = request.method.as_deref() else {
            REQUEST_ERRORS_TOTAL.with_label_values(&["missing"]).inc();
            return (self.error_response(conn, rid, ProtocolError::MissingMethod.into()), None);
        };
        let Some(method) = self.methods.get(name) else {
            REQUEST_ERRORS_TOTAL.with_label_values(&["unknown"]).inc();
            return (
                self.error_response(conn, rid, ProtocolError::UnknownMethod(name.to_string()).into()),
                None,
            );
        };
        let label = method.name();
        REQUESTS_TOTAL.with_label_values(&[label]).inc();

        let result = catch_unwind(AssertUnwindSafe(|| self.execute(method.as_ref(), conn, request)))
            .unwrap_or_else(|panic| {
                let reason = panic_message(panic.as_ref());
                error!(rid, method = label, %reason, "method handler panicked");
                Err(ProtocolError::HandlerPanicked(reason).into())
            });

        match result {
            Ok(outcome) => {
                supersede(conn, rid);
                if outcome.state.is_tracked() {
                    match outcome.handle {
                        Some(handle) => conn.tracker().track_stream(rid, handle),
                        None => conn.tracker().track(rid),
                    }
                }
                debug!(rid, method = label, state = ?outcome.state, "request handled");
                let response = Response::new(rid, outcome.state)
                    .with_updates(outcome.updates)
                    .with_columns(outcome.columns);
                (response, outcome.post_sent)
            }
            Err(e) => {
                REQUEST_ERRORS_TOTAL.with_label_values(&[label]).inc();
                debug!(rid, method = label, msg = %e.msg, "request failed");
                (self.error_response(conn, rid, e), None)
            }
        }
    }

    fn execute(
        &self,
        method: &dyn ResponderMethod,
        conn: &Arc<Connection>,
        request: &Request,
    ) -> MethodResult {
        let permit = request.permit(self.config.default_permit)?;
        let target = if method.requires_node() {
            let path = request.require_path()?;
            let (node, meta) = self
                .tree
                .resolve(path)
                .ok_or_else(|| ProtocolError::NodeNotFound(path.to_string()))?;
            Some(Target { node, meta })
        } else {
            None
        };

        let ctx = MethodContext {
            request,
            conn,
            tree: &self.tree,
            subscriptions: &self.subscriptions,
            permit,
            target,
        };
        method.execute(&ctx)
    }

    fn error_response(
        &self,
        conn: &Connection,
        rid: Rid,
        e: MethodError,
    ) -> Response {
        supersede(conn, rid);
        let detail = if self.config.include_error_detail { e.detail } else { None };
        Response::error(rid, ErrorBody { msg: e.msg, detail })
    }

    /// Out-of-band close of a tracked stream. No-op for unknown rids.
    pub fn close_stream(
        &self,
        conn: &Connection,
        rid: Rid,
    ) -> Result<()> {
        let Some(stream) = conn.tracker().remove(rid) else {
            return Ok(());
        };
        stream.terminate();
        debug!(connection_id = conn.id(), rid, "stream closed by responder");
        conn.write(&ResponseBatch::single(Response::closed(rid)))
    }

    /// Connection teardown: terminates every tracked stream and drops all
    /// subscriptions. Only the first call has an effect.
    pub fn disconnect(
        &self,
        conn: &Connection,
    ) {
        if !conn.close() {
            return;
        }
        let streams = conn.tracker().drain();
        let count = streams.len();
        for (_, stream) in streams {
            stream.terminate();
        }
        self.subscriptions.clear();
        debug!(connection_id = conn.id(), streams = count, "connection torn down");
    }
}

/// A reused rid ends whatever stream was still open under it.
fn supersede(
    conn: &Connection,
    rid: Rid,
) {
    if let Some(previous) = conn.tracker().remove(rid) {
        debug!(connection_id = conn.id(), rid, "rid reused, terminating previous stream");
        previous.terminate();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
