use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tracing::debug;
use tracing::warn;

use crate::LinkHandle;
use crate::ProtocolError;
use crate::Response;
use crate::ResponseBatch;
use crate::Result;
use crate::Rid;
use crate::StreamHandle;
use crate::StreamState;

type CloseHook = Box<dyn FnOnce() + Send>;

/// Open `invoke` of a stream action.
///
/// Rows sent before the initial response is on the wire are buffered and
/// flushed right after it, so the requester always sees the invoke response
/// first.
pub struct InvokeStream {
    rid: Rid,
    link: LinkHandle,
    closed: AtomicBool,
    /// `Some` until the initial response has been written
    pending: Mutex<Option<Vec<JsonValue>>>,
    on_close: Mutex<Option<CloseHook>>,
}

impl InvokeStream {
    pub fn new(
        rid: Rid,
        link: LinkHandle,
    ) -> Self {
        Self {
            rid,
            link,
            closed: AtomicBool::new(false),
            pending: Mutex::new(Some(Vec::new())),
            on_close: Mutex::new(None),
        }
    }

    pub fn rid(&self) -> Rid {
        self.rid
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Registers a hook run once when the stream closes for any reason.
    pub fn on_close(
        &self,
        hook: impl FnOnce() + Send + 'static,
    ) {
        *self.on_close.lock() = Some(Box::new(hook));
    }

    pub fn send_rows(
        &self,
        rows: Vec<Vec<JsonValue>>,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(ProtocolError::StreamClosed(self.rid).into());
        }
        let updates: Vec<JsonValue> = rows.into_iter().map(JsonValue::Array).collect();

        let mut pending = self.pending.lock();
        match pending.as_mut() {
            Some(buffer) => {
                buffer.extend(updates);
                Ok(())
            }
            None => self.link.write(&ResponseBatch::single(
                Response::new(self.rid, StreamState::Open).with_updates(updates),
            )),
        }
    }

    /// Ends the stream from the producer side and tells the requester.
    pub fn close(&self) -> bool {
        if !self.mark_closed() {
            return false;
        }
        let pending = self.pending.lock();
        if pending.is_none() {
            self.write_closed();
        }
        true
    }

    /// Flushes buffered rows once the initial response has been written.
    pub(crate) fn activate(&self) {
        let mut pending = self.pending.lock();
        let Some(buffered) = pending.take() else {
            return;
        };
        if !buffered.is_empty() {
            let batch = ResponseBatch::single(Response::new(self.rid, StreamState::Open).with_updates(buffered));
            if let Err(e) = self.link.write(&batch) {
                warn!(rid = self.rid, error = %e, "buffered invoke rows not delivered");
            }
        }
        if self.is_closed() {
            self.write_closed();
        }
    }

    /// Rows buffered so far; used when the stream closed before it was opened.
    pub(crate) fn take_pending(&self) -> Vec<JsonValue> {
        self.pending.lock().take().unwrap_or_default()
    }

    fn mark_closed(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        debug!(rid = self.rid, "invoke stream closed");
        let hook = self.on_close.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        true
    }

    fn write_closed(&self) {
        let Ok(conn) = self.link.upgrade() else {
            return;
        };
        if conn.tracker().untrack(self.rid) {
            if let Err(e) = conn.write(&ResponseBatch::single(Response::closed(self.rid))) {
                warn!(rid = self.rid, error = %e, "closing response not delivered");
            }
        }
    }
}

impl StreamHandle for InvokeStream {
    /// Remote close: no closing response, the requester asked for it.
    fn terminate(&self) {
        self.mark_closed();
    }
}
