use std::sync::Arc;

use super::*;
use crate::Error;
use crate::Response;
use crate::ResponseBatch;
use crate::SystemError;

#[test]
fn test_link_handle_fails_after_teardown() {
    let (writer, _rx) = ChannelWriter::new();
    let conn = Connection::new(writer);
    let handle = conn.handle();
    assert!(handle.is_alive());
    assert!(handle.upgrade().is_ok());

    drop(conn);
    assert!(!handle.is_alive());
    assert!(matches!(handle.upgrade(), Err(Error::System(SystemError::LinkClosed))));
    assert!(LinkHandle::detached().upgrade().is_err());
}

#[test]
fn test_closed_connection_refuses_writes() {
    let mut writer = MockResponseWriter::new();
    writer.expect_write().times(1).returning(|_| Ok(()));
    let conn = Connection::new(writer);

    conn.write(&ResponseBatch::single(Response::closed(1))).unwrap();
    assert!(conn.close());
    assert!(!conn.close());
    let err = conn.write(&ResponseBatch::single(Response::closed(2))).unwrap_err();
    assert!(err.is_link_closed());
}

#[tokio::test]
async fn test_channel_writer_queues_batches() {
    let (writer, mut rx) = ChannelWriter::new();
    let conn = Connection::new(writer);
    conn.write(&ResponseBatch::single(Response::closed(3))).unwrap();

    let batch = rx.recv().await.unwrap();
    assert_eq!(batch.responses[0].rid, 3);
}

#[test]
fn test_channel_writer_fails_when_receiver_dropped() {
    let (writer, rx) = ChannelWriter::new();
    drop(rx);
    let err = writer.write(&ResponseBatch::default()).unwrap_err();
    assert!(err.is_link_closed());
}

#[test]
fn test_tracker_track_untrack() {
    let tracker = ResponseTracker::new();
    tracker.track(1);
    assert!(tracker.is_tracking(1));
    assert!(tracker.untrack(1));
    assert!(!tracker.untrack(1));
    assert!(!tracker.is_tracking(1));
}

#[test]
fn test_tracker_terminates_stream_handle_on_drain() {
    let tracker = ResponseTracker::new();
    let mut handle = MockStreamHandle::new();
    handle.expect_terminate().times(1).return_const(());
    tracker.track_stream(4, Arc::new(handle));
    tracker.track(5);

    let drained = tracker.drain();
    assert_eq!(drained.len(), 2);
    for (_, stream) in drained {
        stream.terminate();
    }
    assert!(tracker.is_empty());
}
