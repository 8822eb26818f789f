use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::Connection;
use crate::Error;
use crate::MetaKey;
use crate::Node;
use crate::NodeTree;
use crate::Permission;
use crate::ProtocolError;
use crate::Request;
use crate::Result;
use crate::StreamHandle;
use crate::StreamState;
use crate::SubscriptionIndex;

/// Work to run once the response batch carrying this request has been written.
pub type PostSent = Box<dyn FnOnce() + Send>;

pub type MethodResult = std::result::Result<MethodOutcome, MethodError>;

/// What a handler reports back to the dispatcher.
pub struct MethodOutcome {
    pub state: StreamState,
    pub updates: Vec<JsonValue>,
    pub columns: Vec<JsonValue>,
    pub handle: Option<Arc<dyn StreamHandle>>,
    pub post_sent: Option<PostSent>,
}

impl MethodOutcome {
    pub fn new(state: StreamState) -> Self {
        Self {
            state,
            updates: Vec::new(),
            columns: Vec::new(),
            handle: None,
            post_sent: None,
        }
    }

    pub fn closed() -> Self {
        Self::new(StreamState::Closed)
    }

    pub fn open() -> Self {
        Self::new(StreamState::Open)
    }

    pub fn with_updates(
        mut self,
        updates: Vec<JsonValue>,
    ) -> Self {
        self.updates = updates;
        self
    }

    pub fn with_columns(
        mut self,
        columns: Vec<JsonValue>,
    ) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_handle(
        mut self,
        handle: Arc<dyn StreamHandle>,
    ) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn after_sent(
        mut self,
        f: impl FnOnce() + Send + 'static,
    ) -> Self {
        self.post_sent = Some(Box::new(f));
        self
    }
}

/// Failure of one request, turned into `{msg, detail?}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodError {
    pub msg: String,
    pub detail: Option<String>,
}

impl MethodError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            detail: None,
        }
    }
}

impl From<Error> for MethodError {
    fn from(e: Error) -> Self {
        Self {
            msg: e.to_string(),
            detail: Some(format!("{e:?}")),
        }
    }
}

impl From<ProtocolError> for MethodError {
    fn from(e: ProtocolError) -> Self {
        Error::from(e).into()
    }
}

/// Node addressed by a request's `path`, with the optional `@`/`$` suffix.
#[derive(Debug, Clone)]
pub struct Target {
    pub node: Arc<Node>,
    pub meta: Option<MetaKey>,
}

pub struct MethodContext<'a> {
    pub request: &'a Request,
    pub conn: &'a Arc<Connection>,
    pub tree: &'a NodeTree,
    pub subscriptions: &'a Arc<SubscriptionIndex>,
    pub permit: Permission,
    pub target: Option<Target>,
}

impl MethodContext<'_> {
    pub fn target(&self) -> Result<&Target> {
        self.target.as_ref().ok_or_else(|| ProtocolError::MissingField("path").into())
    }

    /// Target that must be a plain node, not an attribute or config.
    pub fn node_target(&self) -> Result<&Arc<Node>> {
        let target = self.target()?;
        if target.meta.is_some() {
            return Err(ProtocolError::InvalidField {
                field: "path",
                reason: "expected a node path".into(),
            }
            .into());
        }
        Ok(&target.node)
    }

    pub fn require(
        &self,
        required: Permission,
    ) -> Result<()> {
        if self.permit.allows(required) {
            Ok(())
        } else {
            Err(ProtocolError::PermissionDenied {
                required,
                permit: self.permit,
            }
            .into())
        }
    }
}

/// One request kind.
pub trait ResponderMethod: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Whether `path` is resolved to a [`Target`] before execution.
    fn requires_node(&self) -> bool {
        true
    }

    fn execute(
        &self,
        ctx: &MethodContext<'_>,
    ) -> MethodResult;
}
