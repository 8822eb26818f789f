use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
#[cfg(test)]
use mockall::automock;

use crate::Rid;

/// Server side of a long lived stream that can be torn down from outside.
#[cfg_attr(test, automock)]
pub trait StreamHandle: Send + Sync + 'static {
    /// Releases whatever the stream holds. Must be idempotent.
    fn terminate(&self);
}

#[derive(Clone, Default)]
pub struct TrackedStream {
    pub handle: Option<Arc<dyn StreamHandle>>,
}

impl TrackedStream {
    pub fn terminate(&self) {
        if let Some(handle) = &self.handle {
            handle.terminate();
        }
    }
}

impl fmt::Debug for TrackedStream {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("TrackedStream").field("has_handle", &self.handle.is_some()).finish()
    }
}

/// Rids of the initialized or open streams of one connection.
#[derive(Default)]
pub struct ResponseTracker {
    streams: DashMap<Rid, TrackedStream>,
}

impl ResponseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(
        &self,
        rid: Rid,
    ) {
        self.streams.insert(rid, TrackedStream::default());
    }

    pub fn track_stream(
        &self,
        rid: Rid,
        handle: Arc<dyn StreamHandle>,
    ) {
        self.streams.insert(rid, TrackedStream { handle: Some(handle) });
    }

    /// Returns whether the rid was tracked.
    pub fn untrack(
        &self,
        rid: Rid,
    ) -> bool {
        self.streams.remove(&rid).is_some()
    }

    pub fn remove(
        &self,
        rid: Rid,
    ) -> Option<TrackedStream> {
        self.streams.remove(&rid).map(|(_, stream)| stream)
    }

    pub fn is_tracking(
        &self,
        rid: Rid,
    ) -> bool {
        self.streams.contains_key(&rid)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Removes and returns every tracked stream.
    pub fn drain(&self) -> Vec<(Rid, TrackedStream)> {
        let rids: Vec<Rid> = self.streams.iter().map(|entry| *entry.key()).collect();
        rids.into_iter().filter_map(|rid| self.remove(rid).map(|stream| (rid, stream))).collect()
    }
}
