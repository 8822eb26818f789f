#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;
use tracing::trace;

use crate::ResponseBatch;
use crate::Result;
use crate::SystemError;

/// Outbound half of a transport.
#[cfg_attr(test, automock)]
pub trait ResponseWriter: Send + Sync + 'static {
    fn write(
        &self,
        batch: &ResponseBatch,
    ) -> Result<()>;
}

/// Hands batches to an async send queue; never blocks the caller.
#[derive(Debug, Clone)]
pub struct ChannelWriter {
    tx: mpsc::UnboundedSender<ResponseBatch>,
}

impl ChannelWriter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ResponseBatch>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ResponseWriter for ChannelWriter {
    fn write(
        &self,
        batch: &ResponseBatch,
    ) -> Result<()> {
        trace!(responses = batch.len(), "queue response batch");
        self.tx.send(batch.clone()).map_err(|_| SystemError::LinkClosed)?;
        Ok(())
    }
}
