//! Case 1: A peer browses the tree, subscribes to a value and writes it.
//!
//! Scenario:
//!
//! 1. The tree holds `/plant/pump` (number, writable) with value 1.
//! 2. The peer sends one batch: `list /plant` and `subscribe /plant/pump`.
//! 3. The peer writes 42, then a string, to `/plant/pump`.
//! 4. A valve is added under `/plant`, the list stream is closed, a drain is added.
//!
//! Expected Result:
//!
//! - The first batch is answered in a single response batch, one response per rid.
//! - The subscription pushes the current value, then 42.
//! - The string write is rejected with an error envelope, the value stays 42.
//! - The valve shows up on the list stream, the drain does not.

use serde_json::json;
use tempfile::tempdir;

use nodelink::StreamState;
use nodelink::Value;
use nodelink::ValueType;
use nodelink::Writable;

use crate::common::drain;
use crate::common::responses;
use crate::common::TestLink;

#[test]
fn test_browse_subscribe_and_write() {
    let dir = tempdir().unwrap();
    let t = TestLink::open(dir.path());
    let pump = t.tree.create_path("/plant/pump").unwrap();
    pump.set_value_type(ValueType::Number);
    pump.set_writable(Writable::Write);
    t.tree.set_value(&pump, Value::now(1i64));

    let (_conn, mut rx) = t.connect();

    // 2
    t.link
        .handle(vec![
            json!({"rid": 1, "method": "list", "path": "/plant"}),
            json!({"rid": 2, "method": "subscribe", "paths": [{"path": "/plant/pump", "sid": 10}]}),
        ])
        .unwrap();
    let batches = drain(&mut rx);
    let push = batches.iter().flat_map(|b| &b.responses).find(|r| r.rid == 0).unwrap();
    assert_eq!(push.updates.as_ref().unwrap()[0][1], json!(1));
    let ack = batches.last().unwrap();
    assert_eq!(ack.responses.len(), 2);
    assert_eq!(ack.responses[0].rid, 1);
    assert_eq!(ack.responses[0].stream, Some(StreamState::Open));
    let listed = ack.responses[0].updates.as_ref().unwrap();
    assert!(listed.iter().any(|row| row[0] == json!("pump")));
    assert_eq!(ack.responses[1].rid, 2);
    assert_eq!(ack.responses[1].stream, Some(StreamState::Closed));

    // 3
    t.link
        .handle(vec![json!({"rid": 3, "method": "set", "path": "/plant/pump", "value": 42})])
        .unwrap();
    let out = responses(&mut rx);
    assert_eq!(out[0].rid, 0);
    assert_eq!(out[0].updates.as_ref().unwrap()[0][0], json!(10));
    assert_eq!(out[0].updates.as_ref().unwrap()[0][1], json!(42));
    assert_eq!(out[1].rid, 3);
    assert!(out[1].error.is_none());

    t.link
        .handle(vec![json!({"rid": 4, "method": "set", "path": "/plant/pump", "value": "high"})])
        .unwrap();
    let out = responses(&mut rx);
    assert_eq!(out.len(), 1);
    assert!(!out[0].error.as_ref().unwrap().msg.is_empty());
    assert_eq!(pump.value().unwrap().to_json(), json!(42));

    // 4
    t.tree.create_path("/plant/valve").unwrap();
    let out = responses(&mut rx);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].rid, 1);
    assert_eq!(out[0].updates.as_ref().unwrap()[0][0], json!("valve"));

    t.link.handle(vec![json!({"rid": 1, "method": "close"})]).unwrap();
    let out = responses(&mut rx);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].stream, Some(StreamState::Closed));
    t.tree.create_path("/plant/drain").unwrap();
    assert!(responses(&mut rx).is_empty());
}

/// Case: every request with a rid gets exactly one response, unusable ones
/// are dropped.
#[test]
fn test_mixed_batch_response_count() {
    let dir = tempdir().unwrap();
    let t = TestLink::open(dir.path());
    t.tree.create_path("/a").unwrap();
    let (_conn, mut rx) = t.connect();

    t.link
        .handle(vec![
            json!({"rid": 1, "method": "list", "path": "/a"}),
            json!({"method": "list", "path": "/a"}),
            json!({"rid": 2, "method": "explode", "path": "/a"}),
            json!({"rid": 3, "path": "/a"}),
            json!({"rid": 4, "method": "list", "path": "/missing"}),
            json!({"rid": "5", "method": "list", "path": "/a"}),
        ])
        .unwrap();

    let batches = drain(&mut rx);
    assert_eq!(batches.len(), 1);
    let rids: Vec<i64> = batches[0].responses.iter().map(|r| r.rid).collect();
    assert_eq!(rids, vec![1, 2, 3, 4]);
    for failed in &batches[0].responses[1..] {
        assert_eq!(failed.stream, Some(StreamState::Closed));
        assert!(!failed.error.as_ref().unwrap().msg.is_empty());
    }
}
