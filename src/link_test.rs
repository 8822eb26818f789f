use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::json;

use crate::test_utils::drain_batches;
use crate::test_utils::enable_logger;
use crate::test_utils::test_responder_config;
use crate::ChannelWriter;
use crate::Link;
use crate::NodeTree;
use crate::Response;
use crate::StreamState;
use crate::Value;

fn setup() -> (Arc<NodeTree>, Arc<AtomicBool>, Link) {
    enable_logger();
    let tree = Arc::new(NodeTree::new());
    let dirty = Arc::new(AtomicBool::new(false));
    let link = Link::new(tree.clone(), test_responder_config(), Some(dirty.clone()));
    (tree, dirty, link)
}

fn flatten(batches: Vec<crate::ResponseBatch>) -> Vec<Response> {
    batches.into_iter().flat_map(|b| b.responses).collect()
}

#[test]
fn test_handle_without_connection_fails() {
    let (_tree, _dirty, link) = setup();
    let err = link.handle(vec![json!({"rid": 1, "method": "list", "path": "/"})]).unwrap_err();
    assert!(err.is_link_closed());
    assert!(link.close_stream(1).unwrap_err().is_link_closed());
}

#[test]
fn test_value_changes_reach_subscribers() {
    let (tree, _dirty, link) = setup();
    let (writer, mut rx) = ChannelWriter::new();
    link.connect(writer);
    let node = tree.create_path("/sensor").unwrap();

    link.handle(vec![json!({"rid": 1, "method": "subscribe", "paths": [{"path": "/sensor", "sid": 9}]})])
        .unwrap();
    drain_batches(&mut rx);

    tree.set_value(&node, Value::now(21i64));
    let pushes = flatten(drain_batches(&mut rx));
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].rid, 0);
    let row = &pushes[0].updates.as_ref().unwrap()[0];
    assert_eq!(row[0], json!(9));
    assert_eq!(row[1], json!(21));

    tree.clear_value(&node);
    let pushes = flatten(drain_batches(&mut rx));
    assert_eq!(pushes[0].updates.as_ref().unwrap()[0], json!([9, null]));
}

#[test]
fn test_child_changes_reach_list_streams() {
    let (tree, _dirty, link) = setup();
    let (writer, mut rx) = ChannelWriter::new();
    link.connect(writer);
    tree.create_path("/dev").unwrap();

    link.handle(vec![json!({"rid": 3, "method": "list", "path": "/dev"})]).unwrap();
    drain_batches(&mut rx);

    let lamp = tree.create_path("/dev/lamp").unwrap();
    let added = flatten(drain_batches(&mut rx));
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].rid, 3);
    assert_eq!(added[0].stream, Some(StreamState::Open));
    assert_eq!(added[0].updates.as_ref().unwrap()[0][0], json!("lamp"));

    tree.remove(&lamp).unwrap();
    let removed = flatten(drain_batches(&mut rx));
    assert_eq!(
        removed[0].updates.as_ref().unwrap()[0],
        json!({"name": "lamp", "change": "remove"})
    );
}

#[test]
fn test_removed_subtree_drops_subscriptions() {
    let (tree, _dirty, link) = setup();
    let (writer, mut rx) = ChannelWriter::new();
    let conn = link.connect(writer);
    let leaf = tree.create_path("/dev/lamp").unwrap();

    link.handle(vec![
        json!({"rid": 1, "method": "subscribe", "paths": [{"path": "/dev/lamp", "sid": 5}]}),
        json!({"rid": 2, "method": "list", "path": "/dev/lamp"}),
    ])
    .unwrap();
    drain_batches(&mut rx);
    assert!(conn.tracker().is_tracking(2));

    tree.remove(&tree.lookup("/dev").unwrap()).unwrap();

    assert!(!link.subscriptions().has_value_sub(&leaf));
    assert!(!link.subscriptions().has_path_sub(&leaf));
    assert!(!conn.tracker().is_tracking(2));
    let responses = flatten(drain_batches(&mut rx));
    assert!(responses.contains(&Response::closed(2)));
}

#[test]
fn test_tree_changes_mark_snapshot_dirty() {
    let (tree, dirty, _link) = setup();
    let node = tree.create_path("/a").unwrap();
    assert!(dirty.swap(false, Ordering::AcqRel));

    tree.set_value(&node, Value::now(true));
    assert!(dirty.swap(false, Ordering::AcqRel));

    tree.set_attribute(&node, "color", json!("red"));
    assert!(dirty.swap(false, Ordering::AcqRel));

    tree.remove(&node).unwrap();
    assert!(dirty.load(Ordering::Acquire));
}

#[test]
fn test_reconnect_tears_down_previous_peer() {
    let (tree, _dirty, link) = setup();
    let node = tree.create_path("/a").unwrap();

    let (first_writer, mut first_rx) = ChannelWriter::new();
    let first = link.connect(first_writer);
    link.handle(vec![
        json!({"rid": 1, "method": "subscribe", "paths": [{"path": "/a", "sid": 1}]}),
        json!({"rid": 2, "method": "list", "path": "/a"}),
    ])
    .unwrap();
    drain_batches(&mut first_rx);

    let (second_writer, mut second_rx) = ChannelWriter::new();
    let second = link.connect(second_writer);

    assert!(first.is_closed());
    assert!(first.tracker().is_empty());
    assert!(!link.subscriptions().has_value_sub(&node));
    assert_eq!(link.connection().unwrap().id(), second.id());

    link.handle(vec![json!({"rid": 1, "method": "subscribe", "paths": [{"path": "/a", "sid": 1}]})])
        .unwrap();
    assert!(!drain_batches(&mut second_rx).is_empty());
    assert!(drain_batches(&mut first_rx).is_empty());
}

#[test]
fn test_disconnect_is_idempotent() {
    let (_tree, _dirty, link) = setup();
    let (writer, _rx) = ChannelWriter::new();
    let conn = link.connect(writer);

    assert!(link.disconnect());
    assert!(!link.disconnect());
    assert!(conn.is_closed());
    assert!(!link.is_connected());
}

#[test]
fn test_handle_disconnects_when_peer_is_gone() {
    let (_tree, _dirty, link) = setup();
    let (writer, rx) = ChannelWriter::new();
    link.connect(writer);
    drop(rx);

    let err = link.handle(vec![json!({"rid": 1, "method": "list", "path": "/"})]).unwrap_err();
    assert!(err.is_link_closed());
    assert!(!link.is_connected());
}
