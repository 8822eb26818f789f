use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use nodelink::ChannelWriter;
use nodelink::Connection;
use nodelink::Link;
use nodelink::NodeTree;
use nodelink::Permission;
use nodelink::ResponderConfig;
use nodelink::Response;
use nodelink::ResponseBatch;
use nodelink::SnapshotManager;
use tokio::sync::mpsc::UnboundedReceiver;

pub const SNAPSHOT_FILE: &str = "nodes.json";

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

pub fn responder_config() -> ResponderConfig {
    ResponderConfig {
        default_permit: Permission::Config,
        include_error_detail: true,
    }
}

/// A link backed by a snapshot file in `data_dir`, restored and ready.
pub struct TestLink {
    pub tree: Arc<NodeTree>,
    pub snapshot: Arc<SnapshotManager>,
    pub link: Link,
}

impl TestLink {
    pub fn open(data_dir: &Path) -> Self {
        enable_logger();
        let tree = Arc::new(NodeTree::new());
        let snapshot = Arc::new(SnapshotManager::new(
            data_dir.join(SNAPSHOT_FILE),
            tree.clone(),
            Duration::from_millis(50),
        ));
        snapshot.restore().expect("restore snapshot");
        let link = Link::new(tree.clone(), responder_config(), Some(snapshot.dirty_flag()));
        Self { tree, snapshot, link }
    }

    pub fn connect(&self) -> (Arc<Connection>, UnboundedReceiver<ResponseBatch>) {
        let (writer, rx) = ChannelWriter::new();
        (self.link.connect(writer), rx)
    }
}

pub fn drain(rx: &mut UnboundedReceiver<ResponseBatch>) -> Vec<ResponseBatch> {
    let mut batches = Vec::new();
    while let Ok(batch) = rx.try_recv() {
        batches.push(batch);
    }
    batches
}

pub fn responses(rx: &mut UnboundedReceiver<ResponseBatch>) -> Vec<Response> {
    drain(rx).into_iter().flat_map(|b| b.responses).collect()
}
