use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;

use tracing::debug;

use super::ResponseTracker;
use super::ResponseWriter;
use crate::ResponseBatch;
use crate::Result;
use crate::SystemError;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// One remote requester: its outbound writer and its open streams.
pub struct Connection {
    id: u64,
    writer: Box<dyn ResponseWriter>,
    tracker: ResponseTracker,
    closed: AtomicBool,
}

impl Connection {
    pub fn new(writer: impl ResponseWriter) -> Arc<Self> {
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        Arc::new(Self {
            id,
            writer: Box::new(writer),
            tracker: ResponseTracker::new(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn tracker(&self) -> &ResponseTracker {
        &self.tracker
    }

    pub fn write(
        &self,
        batch: &ResponseBatch,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(SystemError::LinkClosed.into());
        }
        self.writer.write(batch)
    }

    pub fn handle(self: &Arc<Self>) -> LinkHandle {
        LinkHandle::new(self)
    }

    /// Marks the connection closed. Returns `true` only for the first call.
    pub fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::AcqRel);
        if first {
            debug!(connection_id = self.id, "connection closed");
        }
        first
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Non-owning reference from long lived state back to its connection.
#[derive(Clone, Default)]
pub struct LinkHandle(Weak<Connection>);

impl LinkHandle {
    pub fn new(connection: &Arc<Connection>) -> Self {
        Self(Arc::downgrade(connection))
    }

    /// A handle that never resolves.
    pub fn detached() -> Self {
        Self(Weak::new())
    }

    pub fn upgrade(&self) -> Result<Arc<Connection>> {
        self.0.upgrade().ok_or_else(|| SystemError::LinkClosed.into())
    }

    pub fn is_alive(&self) -> bool {
        self.0.upgrade().is_some_and(|conn| !conn.is_closed())
    }

    pub fn write(
        &self,
        batch: &ResponseBatch,
    ) -> Result<()> {
        self.upgrade()?.write(batch)
    }
}

impl std::fmt::Debug for LinkHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let id = self.0.upgrade().map(|conn| conn.id());
        f.debug_tuple("LinkHandle").field(&id).finish()
    }
}
