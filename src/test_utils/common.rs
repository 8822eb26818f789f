use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::ResponderConfig;
use crate::ChannelWriter;
use crate::Connection;
use crate::NodeTree;
use crate::Permission;
use crate::Responder;
use crate::Response;
use crate::ResponseBatch;
use crate::SubscriptionIndex;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

pub fn test_responder_config() -> ResponderConfig {
    ResponderConfig {
        default_permit: Permission::Config,
        include_error_detail: false,
    }
}

/// Responder wired to one channel-backed connection.
pub struct ResponderHarness {
    pub tree: Arc<NodeTree>,
    pub subscriptions: Arc<SubscriptionIndex>,
    pub responder: Responder,
    pub conn: Arc<Connection>,
    pub rx: UnboundedReceiver<ResponseBatch>,
}

impl ResponderHarness {
    pub fn new() -> Self {
        Self::with_config(test_responder_config())
    }

    pub fn with_config(config: ResponderConfig) -> Self {
        let tree = Arc::new(NodeTree::new());
        let (writer, rx) = ChannelWriter::new();
        let conn = Connection::new(writer);
        let subscriptions = Arc::new(SubscriptionIndex::new(conn.handle()));
        let responder = Responder::new(tree.clone(), subscriptions.clone(), config);
        Self {
            tree,
            subscriptions,
            responder,
            conn,
            rx,
        }
    }

    /// Every batch written so far.
    pub fn batches(&mut self) -> Vec<ResponseBatch> {
        drain_batches(&mut self.rx)
    }

    /// Every response written so far, flattened across batches.
    pub fn responses(&mut self) -> Vec<Response> {
        self.batches().into_iter().flat_map(|b| b.responses).collect()
    }
}

pub fn drain_batches(rx: &mut UnboundedReceiver<ResponseBatch>) -> Vec<ResponseBatch> {
    let mut batches = Vec::new();
    while let Ok(batch) = rx.try_recv() {
        batches.push(batch);
    }
    batches
}
