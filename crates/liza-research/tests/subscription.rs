//! Integration tests for `SubscriptionChannel` against an in-process
//! `graphql-transport-ws` server.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use liza_research::{
    LongTailAggregate, LongTailObserver, LongTailSubscriber, PartialUpdateEnvelope,
    SubscriptionChannel, SubscriptionError,
};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

type ServerWs = WebSocketStream<TcpStream>;

const WAIT: Duration = Duration::from_secs(5);

#[allow(clippy::unnecessary_wraps)]
fn echo_subprotocol(_req: &Request, mut resp: Response) -> Result<Response, ErrorResponse> {
    resp.headers_mut().insert(
        "Sec-WebSocket-Protocol",
        HeaderValue::from_static("graphql-transport-ws"),
    );
    Ok(resp)
}

/// Accepts one connection and runs `script` on it.
async fn serve<F, Fut, T>(script: F) -> (String, JoinHandle<T>)
where
    F: FnOnce(ServerWs) -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send,
    T: Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_hdr_async(stream, echo_subprotocol)
            .await
            .unwrap();
        script(ws).await
    });
    (format!("ws://{addr}/graphql"), task)
}

async fn recv_json(ws: &mut ServerWs) -> Value {
    loop {
        match ws.next().await.expect("client frame").expect("valid frame") {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Close(_) => panic!("client closed unexpectedly"),
            _ => {}
        }
    }
}

async fn send_json(ws: &mut ServerWs, value: &Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

/// Reads until the client closes, answering its close handshake.
async fn drain(ws: &mut ServerWs) {
    while let Some(Ok(_)) = ws.next().await {}
}

async fn handshake(ws: &mut ServerWs) -> Value {
    assert_eq!(recv_json(ws).await["type"], "connection_init");
    send_json(ws, &json!({ "type": "connection_ack" })).await;
    let subscribe = recv_json(ws).await;
    assert_eq!(subscribe["type"], "subscribe");
    subscribe
}

fn candidates(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            json!({
                "keyword": format!("youtube seo tip {i}"),
                "grade": if i % 2 == 0 { "A" } else { "C" },
                "opportunity": 60.0,
                "difficulty": 30.0,
                "searchVolume": 1000,
                "source": "youtube"
            })
        })
        .collect()
}

fn next_frame(analyzed: u32, total: u32, results: usize, complete: bool) -> Value {
    json!({
        "id": "1",
        "type": "next",
        "payload": { "data": { "onLongTailAnalyzed": {
            "parentKeyword": "youtube seo",
            "isComplete": complete,
            "analyzedCount": analyzed,
            "totalCount": total,
            "allResults": candidates(results)
        }}}
    })
}

#[derive(Default)]
struct Recorder {
    updates: Mutex<Vec<PartialUpdateEnvelope>>,
    completions: AtomicUsize,
    errors: Mutex<Vec<SubscriptionError>>,
    first_update: Notify,
    done: Notify,
}

impl Recorder {
    fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    async fn wait_done(&self) {
        tokio::time::timeout(WAIT, self.done.notified())
            .await
            .expect("subscription should terminate");
    }
}

impl LongTailObserver for Recorder {
    fn on_update(&self, update: PartialUpdateEnvelope) {
        self.updates.lock().unwrap().push(update);
        self.first_update.notify_one();
    }

    fn on_complete(&self) {
        self.completions.fetch_add(1, Ordering::SeqCst);
        self.done.notify_one();
    }

    fn on_error(&self, error: SubscriptionError) {
        self.errors.lock().unwrap().push(error);
        self.done.notify_one();
    }
}

#[tokio::test]
async fn streams_partial_results_until_complete() {
    let (url, server) = serve(|mut ws| async move {
        let subscribe = handshake(&mut ws).await;
        assert_eq!(subscribe["id"], "1");
        assert_eq!(subscribe["payload"]["variables"]["parentKeyword"], "youtube seo");
        assert!(subscribe["payload"]["query"]
            .as_str()
            .unwrap()
            .contains("onLongTailAnalyzed"));

        send_json(&mut ws, &next_frame(3, 15, 3, false)).await;
        send_json(&mut ws, &next_frame(15, 15, 15, true)).await;

        let complete = recv_json(&mut ws).await;
        // Late frame after completion; the client must ignore it.
        let _ = ws.send(Message::Text(next_frame(15, 15, 2, false).to_string())).await;
        drain(&mut ws).await;
        complete
    })
    .await;

    let recorder = Arc::new(Recorder::default());
    let handle = SubscriptionChannel::new(&url).subscribe("youtube seo", recorder.clone());
    recorder.wait_done().await;

    let complete = tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
    assert_eq!(complete, json!({ "type": "complete", "id": "1" }));

    assert_eq!(recorder.completions.load(Ordering::SeqCst), 1);
    assert!(recorder.errors.lock().unwrap().is_empty());
    assert!(!handle.is_active());

    let mut aggregate = LongTailAggregate::new();
    for update in recorder.updates.lock().unwrap().iter() {
        aggregate.apply(update);
    }
    assert_eq!(recorder.update_count(), 2);
    assert_eq!(aggregate.candidates().len(), 15);
    assert_eq!(aggregate.analyzed_count(), 15);
    assert_eq!(aggregate.total_count(), 15);
    assert!(aggregate.is_finished());
    assert_eq!(aggregate.high_grade().len(), 8);
}

#[tokio::test]
async fn server_complete_frame_ends_subscription() {
    let (url, _server) = serve(|mut ws| async move {
        handshake(&mut ws).await;
        send_json(&mut ws, &next_frame(1, 15, 1, false)).await;
        send_json(&mut ws, &json!({ "type": "complete", "id": "1" })).await;
        drain(&mut ws).await;
    })
    .await;

    let recorder = Arc::new(Recorder::default());
    let _handle = SubscriptionChannel::new(&url).subscribe("youtube seo", recorder.clone());
    recorder.wait_done().await;

    assert_eq!(recorder.update_count(), 1);
    assert_eq!(recorder.completions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn error_frame_reports_first_message() {
    let (url, _server) = serve(|mut ws| async move {
        handshake(&mut ws).await;
        send_json(
            &mut ws,
            &json!({
                "type": "error",
                "id": "1",
                "payload": [
                    { "message": "Analysis backend unavailable" },
                    { "message": "second" }
                ]
            }),
        )
        .await;
        drain(&mut ws).await;
    })
    .await;

    let recorder = Arc::new(Recorder::default());
    let _handle = SubscriptionChannel::new(&url).subscribe("youtube seo", recorder.clone());
    recorder.wait_done().await;

    let errors = recorder.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        SubscriptionError::Server { message, errors } => {
            assert_eq!(message, "Analysis backend unavailable");
            assert_eq!(errors.len(), 2);
        }
        other => panic!("expected Server error, got {other:?}"),
    }
    assert_eq!(recorder.completions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn error_frame_without_message_still_ends_the_stream() {
    let (url, _server) = serve(|mut ws| async move {
        handshake(&mut ws).await;
        send_json(
            &mut ws,
            &json!({
                "type": "error",
                "id": "1",
                "payload": [{ "extensions": { "code": "INTERNAL_SERVER_ERROR" } }]
            }),
        )
        .await;
        drain(&mut ws).await;
    })
    .await;

    let recorder = Arc::new(Recorder::default());
    let _handle = SubscriptionChannel::new(&url).subscribe("youtube seo", recorder.clone());
    recorder.wait_done().await;

    let errors = recorder.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        SubscriptionError::Server { message, .. } if message == "Subscription error"
    ));
}

#[tokio::test]
async fn close_before_ack_is_premature_close() {
    let (url, _server) = serve(|mut ws| async move {
        assert_eq!(recv_json(&mut ws).await["type"], "connection_init");
        ws.close(None).await.unwrap();
        drain(&mut ws).await;
    })
    .await;

    let recorder = Arc::new(Recorder::default());
    let _handle = SubscriptionChannel::new(&url).subscribe("youtube seo", recorder.clone());
    recorder.wait_done().await;

    let errors = recorder.errors.lock().unwrap();
    assert!(
        matches!(errors.as_slice(), [SubscriptionError::PrematureClose]),
        "got {errors:?}"
    );
    assert!(errors[0].never_started());
}

#[tokio::test]
async fn close_after_ack_is_closed_before_complete() {
    let (url, _server) = serve(|mut ws| async move {
        handshake(&mut ws).await;
        send_json(&mut ws, &next_frame(2, 15, 2, false)).await;
        ws.close(None).await.unwrap();
        drain(&mut ws).await;
    })
    .await;

    let recorder = Arc::new(Recorder::default());
    let _handle = SubscriptionChannel::new(&url).subscribe("youtube seo", recorder.clone());
    recorder.wait_done().await;

    assert_eq!(recorder.update_count(), 1);
    let errors = recorder.errors.lock().unwrap();
    assert!(
        matches!(errors.as_slice(), [SubscriptionError::ClosedBeforeComplete]),
        "got {errors:?}"
    );
}

#[tokio::test]
async fn missing_ack_times_out() {
    let (url, _server) = serve(|mut ws| async move {
        assert_eq!(recv_json(&mut ws).await["type"], "connection_init");
        drain(&mut ws).await;
    })
    .await;

    let recorder = Arc::new(Recorder::default());
    let channel = SubscriptionChannel::new(&url).with_ack_timeout(Duration::from_millis(200));
    let _handle = channel.subscribe("youtube seo", recorder.clone());
    recorder.wait_done().await;

    let errors = recorder.errors.lock().unwrap();
    assert!(
        matches!(errors.as_slice(), [SubscriptionError::AckTimeout(d)] if *d == Duration::from_millis(200)),
        "got {errors:?}"
    );
}

#[tokio::test]
async fn ping_is_answered_with_pong() {
    let (url, server) = serve(|mut ws| async move {
        handshake(&mut ws).await;
        send_json(&mut ws, &json!({ "type": "ping" })).await;
        let pong = recv_json(&mut ws).await;
        send_json(&mut ws, &next_frame(15, 15, 1, true)).await;
        drain(&mut ws).await;
        pong
    })
    .await;

    let recorder = Arc::new(Recorder::default());
    let _handle = SubscriptionChannel::new(&url).subscribe("youtube seo", recorder.clone());
    recorder.wait_done().await;

    let pong = tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
    assert_eq!(pong["type"], "pong");
}

#[tokio::test]
async fn cancel_sends_complete_and_stops_delivery() {
    let (url, server) = serve(|mut ws| async move {
        handshake(&mut ws).await;
        send_json(&mut ws, &next_frame(1, 15, 1, false)).await;
        let complete = recv_json(&mut ws).await;
        // In flight when the client cancelled.
        let _ = ws.send(Message::Text(next_frame(2, 15, 2, false).to_string())).await;
        drain(&mut ws).await;
        complete
    })
    .await;

    let recorder = Arc::new(Recorder::default());
    let handle = SubscriptionChannel::new(&url).subscribe("youtube seo", recorder.clone());
    tokio::time::timeout(WAIT, recorder.first_update.notified())
        .await
        .expect("first update");

    handle.cancel();
    handle.cancel();
    assert!(!handle.is_active());
    assert!(handle.is_cancelled());

    let complete = tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
    assert_eq!(complete, json!({ "type": "complete", "id": "1" }));
    assert_eq!(recorder.update_count(), 1);
    assert_eq!(recorder.completions.load(Ordering::SeqCst), 0);
    assert!(recorder.errors.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_endpoint_reports_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let recorder = Arc::new(Recorder::default());
    let _handle = SubscriptionChannel::new(&format!("ws://{addr}/graphql"))
        .subscribe("youtube seo", recorder.clone());
    recorder.wait_done().await;

    let errors = recorder.errors.lock().unwrap();
    assert!(
        matches!(errors.as_slice(), [SubscriptionError::Transport(_)]),
        "got {errors:?}"
    );
}
