//! Case 2: Startup recovers from a primary snapshot corrupted by a crash.
//!
//! Scenario:
//!
//! 1. Two flushes leave a valid primary and a valid backup.
//! 2. The primary is truncated, as if the process died mid-write.
//! 3. The link restarts on the same data dir.
//!
//! Expected Result:
//!
//! - The tree is restored from the backup (the state of the first flush).
//! - The primary is rewritten with the backup content and the truncated file is kept aside.
//! - With the backup corrupted too, restore fails instead of starting empty.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::tempdir;

use nodelink::Error;
use nodelink::NodeTree;
use nodelink::RestoreSource;
use nodelink::SnapshotError;
use nodelink::SnapshotManager;
use nodelink::Value;

use crate::common::TestLink;
use crate::common::SNAPSHOT_FILE;

#[test]
fn test_restart_after_torn_write() {
    let dir = tempdir().unwrap();
    let primary = dir.path().join(SNAPSHOT_FILE);

    // 1
    {
        let t = TestLink::open(dir.path());
        let counter = t.tree.create_path("/counter").unwrap();
        t.tree.set_value(&counter, Value::now(1i64));
        t.snapshot.flush().unwrap();
        t.tree.set_value(&counter, Value::now(2i64));
        t.snapshot.flush().unwrap();
    }

    // 2
    let bytes = std::fs::read(&primary).unwrap();
    std::fs::write(&primary, &bytes[..bytes.len() / 2]).unwrap();

    // 3
    let tree = Arc::new(NodeTree::new());
    let manager = SnapshotManager::new(&primary, tree.clone(), Duration::from_secs(60));
    assert_eq!(manager.restore().unwrap(), RestoreSource::Backup);
    assert_eq!(tree.lookup("/counter").unwrap().value().unwrap().to_json(), json!(1));
    assert_eq!(std::fs::read(&primary).unwrap(), std::fs::read(manager.backup_path()).unwrap());
    assert_eq!(std::fs::read(manager.corrupt_path()).unwrap(), &bytes[..bytes.len() / 2]);

    // the rewritten primary restores on the next start
    let t = TestLink::open(dir.path());
    assert!(t.tree.lookup("/counter").is_some());
}

#[test]
fn test_both_snapshots_corrupt_fails_startup() {
    let dir = tempdir().unwrap();
    let primary = dir.path().join(SNAPSHOT_FILE);
    std::fs::write(&primary, b"{\"a\": ").unwrap();
    std::fs::write(dir.path().join(format!("{SNAPSHOT_FILE}.bak")), b"[]").unwrap();

    let manager = SnapshotManager::new(&primary, Arc::new(NodeTree::new()), Duration::from_secs(60));
    let err = manager.restore().unwrap_err();
    assert!(matches!(err, Error::Snapshot(SnapshotError::Unrecoverable { .. })));
}
