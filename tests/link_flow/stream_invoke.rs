//! Case 2: A streaming action keeps its invoke open until one side closes it.
//!
//! Scenario:
//!
//! 1. `/tools/tail` carries a stream action that hands its stream to a producer.
//! 2. The peer invokes it twice (rid 7 and rid 8).
//! 3. The producer sends rows on rid 7, then the peer closes rid 7.
//! 4. The producer closes rid 8 itself.
//!
//! Expected Result:
//!
//! - Both invokes are answered with an open response.
//! - Rows reach the peer on rid 7 until the peer closes it; the close hook runs and
//!   later sends fail.
//! - Closing rid 8 from the producer side writes one closed response and untracks it.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::json;
use tempfile::tempdir;

use nodelink::Action;
use nodelink::ActionResult;
use nodelink::InvokeStream;
use nodelink::Permission;
use nodelink::ResultType;
use nodelink::StreamState;

use crate::common::responses;
use crate::common::TestLink;

#[test]
fn test_stream_invoke_lifecycle() {
    let dir = tempdir().unwrap();
    let t = TestLink::open(dir.path());

    let producers: Arc<Mutex<Vec<Arc<InvokeStream>>>> = Arc::new(Mutex::new(Vec::new()));
    let hook_ran = Arc::new(AtomicBool::new(false));
    let tail = t.tree.create_path("/tools/tail").unwrap();
    {
        let producers = producers.clone();
        let hook_ran = hook_ran.clone();
        tail.set_action(
            Action::new(Permission::Write, move |invocation| {
                let stream = invocation.stream.expect("stream action");
                if stream.rid() == 7 {
                    let hook_ran = hook_ran.clone();
                    stream.on_close(move || hook_ran.store(true, Ordering::SeqCst));
                }
                producers.lock().unwrap().push(stream);
                Ok(ActionResult::empty())
            })
            .with_result_type(ResultType::Stream),
        );
    }
    let (conn, mut rx) = t.connect();

    // 2
    t.link
        .handle(vec![
            json!({"rid": 7, "method": "invoke", "path": "/tools/tail", "params": {}}),
            json!({"rid": 8, "method": "invoke", "path": "/tools/tail"}),
        ])
        .unwrap();
    let out = responses(&mut rx);
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|r| r.stream == Some(StreamState::Open)));
    assert!(conn.tracker().is_tracking(7));
    assert!(conn.tracker().is_tracking(8));

    let (first, second) = {
        let producers = producers.lock().unwrap();
        (producers[0].clone(), producers[1].clone())
    };

    // 3
    first.send_rows(vec![vec![json!("line 1")], vec![json!("line 2")]]).unwrap();
    let out = responses(&mut rx);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].rid, 7);
    assert_eq!(out[0].updates.as_ref().unwrap().len(), 2);

    t.link.handle(vec![json!({"rid": 7, "method": "close"})]).unwrap();
    let out = responses(&mut rx);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].stream, Some(StreamState::Closed));
    assert!(hook_ran.load(Ordering::SeqCst));
    assert!(first.is_closed());
    assert!(first.send_rows(vec![vec![json!("late")]]).is_err());
    assert!(responses(&mut rx).is_empty());

    // 4
    assert!(second.close());
    assert!(!second.close());
    let out = responses(&mut rx);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].rid, 8);
    assert_eq!(out[0].stream, Some(StreamState::Closed));
    assert!(!conn.tracker().is_tracking(8));
}
