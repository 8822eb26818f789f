//! Responder Error Hierarchy
//!
//! Defines the error types of the node responder, categorized by the layer that
//! raises them: infrastructure, protocol handling, node tree, subscriptions and
//! snapshot persistence.

use std::path::PathBuf;

use config::ConfigError;
use tokio::task::JoinError;

use crate::Permission;
use crate::Rid;
use crate::Sid;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (I/O, serialization, connection)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Malformed or disallowed requests
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Node tree mutation failures
    #[error(transparent)]
    Node(#[from] NodeError),

    /// Subscription index invariant violations
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    /// Snapshot persistence failures
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Configuration validation failures
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// Disk I/O failures
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// I/O failure bound to a concrete path
    #[error("I/O error at path {path:?}: {source}")]
    PathError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON encoding/decoding failures
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// The owning connection has been torn down
    #[error("Link is closed")]
    LinkClosed,

    /// Transport refused an outbound batch
    #[error("Failed to write response batch: {0}")]
    WriteFailed(String),

    /// Background task could not be spawned or joined
    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),

    /// A tokio runtime is required for the requested operation
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Missing method field")]
    MissingMethod,

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Missing {0} field")]
    MissingField(&'static str),

    #[error("Invalid {field} field: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Permission denied: requires {required}, permit is {permit}")]
    PermissionDenied {
        required: Permission,
        permit: Permission,
    },

    #[error("Node is not writable: {0}")]
    NotWritable(String),

    #[error("Node is not invokable: {0}")]
    NotInvokable(String),

    #[error("Node already has an open list stream: {0}")]
    AlreadyListed(String),

    #[error("Stream {0} is closed")]
    StreamClosed(Rid),

    #[error("Handler panicked: {0}")]
    HandlerPanicked(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("Invalid node name: {0:?}")]
    InvalidName(String),

    #[error("Node not found: {0}")]
    NotFound(String),

    #[error("The root node cannot be removed")]
    RootRemoval,

    #[error("Node {path} is detached from the tree")]
    Detached { path: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    /// A node holds at most one value subscription
    #[error("Node {path} already subscribed with sid {sid}")]
    NodeAlreadySubscribed { path: String, sid: Sid },

    /// An sid routes to exactly one node
    #[error("Sid {sid} already used by node {path}")]
    SidInUse { sid: Sid, path: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The document could not be decoded into a node tree
    #[error("Snapshot {path:?} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Neither the primary nor the backup could be decoded
    #[error("No readable snapshot: primary {primary:?}, backup {backup:?}")]
    Unrecoverable { primary: PathBuf, backup: PathBuf },
}

// ============== Conversion Implementations ============== //
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::System(SystemError::Io(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::System(SystemError::Serialization(e))
    }
}

impl From<JoinError> for Error {
    fn from(err: JoinError) -> Self {
        SystemError::TaskFailed(err).into()
    }
}

impl Error {
    /// True when the failure means the remote endpoint is gone rather than the
    /// request being wrong.
    pub fn is_link_closed(&self) -> bool {
        matches!(self, Error::System(SystemError::LinkClosed))
    }
}
