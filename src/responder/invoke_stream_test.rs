use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::test_utils::drain_batches;
use crate::ChannelWriter;
use crate::Connection;
use crate::Error;
use crate::ProtocolError;
use crate::Response;
use crate::StreamHandle;
use crate::StreamState;

#[test]
fn test_rows_are_buffered_until_activated() {
    let (writer, mut rx) = ChannelWriter::new();
    let conn = Connection::new(writer);
    let stream = InvokeStream::new(1, conn.handle());

    stream.send_rows(vec![vec![json!(1)], vec![json!(2)]]).unwrap();
    assert!(drain_batches(&mut rx).is_empty());

    stream.activate();
    stream.send_rows(vec![vec![json!(3)]]).unwrap();

    let responses: Vec<Response> = drain_batches(&mut rx).into_iter().flat_map(|b| b.responses).collect();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].updates, Some(vec![json!([1]), json!([2])]));
    assert_eq!(responses[1].updates, Some(vec![json!([3])]));
    assert!(responses.iter().all(|r| r.stream == Some(StreamState::Open)));
}

#[test]
fn test_close_writes_closing_response_once() {
    let (writer, mut rx) = ChannelWriter::new();
    let conn = Connection::new(writer);
    conn.tracker().track(2);
    let stream = InvokeStream::new(2, conn.handle());
    stream.activate();

    assert!(stream.close());
    assert!(!stream.close());

    let responses: Vec<Response> = drain_batches(&mut rx).into_iter().flat_map(|b| b.responses).collect();
    assert_eq!(responses, vec![Response::closed(2)]);
    assert!(!conn.tracker().is_tracking(2));
    assert!(matches!(
        stream.send_rows(vec![vec![json!(1)]]),
        Err(Error::Protocol(ProtocolError::StreamClosed(2)))
    ));
}

#[test]
fn test_close_before_activation_is_flushed_on_activate() {
    let (writer, mut rx) = ChannelWriter::new();
    let conn = Connection::new(writer);
    conn.tracker().track(3);
    let stream = InvokeStream::new(3, conn.handle());

    stream.send_rows(vec![vec![json!("x")]]).unwrap();
    stream.close();
    assert!(drain_batches(&mut rx).is_empty());

    stream.activate();
    let responses: Vec<Response> = drain_batches(&mut rx).into_iter().flat_map(|b| b.responses).collect();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].updates, Some(vec![json!(["x"])]));
    assert_eq!(responses[1], Response::closed(3));
}

#[test]
fn test_terminate_runs_hook_without_writing() {
    let (writer, mut rx) = ChannelWriter::new();
    let conn = Connection::new(writer);
    conn.tracker().track(4);
    let stream = InvokeStream::new(4, conn.handle());
    stream.activate();

    let calls = Arc::new(AtomicUsize::new(0));
    let hook_calls = calls.clone();
    stream.on_close(move || {
        hook_calls.fetch_add(1, Ordering::SeqCst);
    });

    stream.terminate();
    stream.terminate();
    stream.close();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(stream.is_closed());
    assert!(drain_batches(&mut rx).is_empty());
}

#[test]
fn test_close_hook_may_touch_its_stream() {
    let (writer, _rx) = ChannelWriter::new();
    let conn = Connection::new(writer);
    let stream = Arc::new(InvokeStream::new(9, conn.handle()));
    let calls = Arc::new(AtomicUsize::new(0));

    let inner = stream.clone();
    let counter = calls.clone();
    stream.on_close(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        inner.on_close(|| {});
        assert!(inner.is_closed());
    });

    stream.terminate();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!stream.close());
}
