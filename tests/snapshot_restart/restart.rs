//! Case 1: Tree changes made through a link survive a restart.
//!
//! Scenario:
//!
//! 1. A link with a running flush task creates nodes, values, an attribute and a config.
//! 2. The peer writes a value through `set`.
//! 3. The flush task persists the tree; the process "restarts" on the same data dir.
//!
//! Expected Result:
//!
//! - The restarted tree is value-equal to the one before the restart, timestamps included.
//! - The previous snapshot is kept as a backup once a second write happened.

use std::time::Duration;

use serde_json::json;
use tempfile::tempdir;

use nodelink::encode_tree;
use nodelink::RestoreSource;
use nodelink::Value;
use nodelink::ValueType;
use nodelink::Writable;

use crate::common::responses;
use crate::common::TestLink;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tree_survives_restart() {
    let dir = tempdir().unwrap();

    let before = {
        let t = TestLink::open(dir.path());
        t.snapshot.start().unwrap();

        // 1
        let temp = t.tree.create_path("/room/temp").unwrap();
        temp.set_value_type(ValueType::Number);
        temp.set_writable(Writable::Write);
        t.tree.set_value(&temp, Value::now(19i64));
        let light = t.tree.create_path("/room/light").unwrap();
        t.tree.set_value(&light, Value::now(false));
        t.tree.set_attribute(&light, "floor", json!(2));
        t.tree.set_config(&light, "unit", json!("lux"));

        // 2
        let (_conn, mut rx) = t.connect();
        t.link
            .handle(vec![json!({"rid": 1, "method": "set", "path": "/room/temp", "value": 21})])
            .unwrap();
        assert!(responses(&mut rx)[0].error.is_none());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(t.snapshot.writes() >= 1);
        assert!(!t.snapshot.is_changed());

        t.snapshot.stop();
        t.snapshot.flush().unwrap();
        assert!(t.snapshot.backup_path().exists());
        encode_tree(&t.tree)
    };

    // 3
    let t = TestLink::open(dir.path());
    assert_eq!(encode_tree(&t.tree), before);
    let temp = t.tree.lookup("/room/temp").unwrap();
    assert_eq!(temp.value().unwrap().to_json(), json!(21));
    assert_eq!(temp.writable(), Writable::Write);
    let light = t.tree.lookup("/room/light").unwrap();
    assert_eq!(light.attribute("floor"), Some(json!(2)));
    assert_eq!(light.config("unit"), Some(json!("lux")));

    // a restore is not a change
    assert!(!t.snapshot.is_changed());
    assert_eq!(t.snapshot.restore().unwrap(), RestoreSource::Primary);
}
