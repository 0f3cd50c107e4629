//! End-to-end relay tests over real sockets.

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use wirebench_server::{AppState, ServerConfig, router};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (String, Arc<AppState>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(AppState::new());
    let app = router(Arc::clone(&state), &ServerConfig::default());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("ws://{}/ws", addr), state)
}

async fn client(url: &str) -> Client {
    let (socket, _) = connect_async(url).await.unwrap();
    socket
}

async fn send(client: &mut Client, value: Value) {
    client.send(Message::text(value.to_string())).await.unwrap();
}

async fn join(client: &mut Client, doc: Value) {
    send(client, json!({"event": "join_document", "data": doc})).await;
}

/// Next text frame as JSON, or `None` if nothing arrives shortly.
async fn next_json(client: &mut Client) -> Option<Value> {
    let frame = tokio::time::timeout(Duration::from_millis(300), client.next())
        .await
        .ok()??
        .ok()?;
    match frame {
        Message::Text(text) => serde_json::from_str(text.as_str()).ok(),
        _ => None,
    }
}

/// Joins carry no acknowledgement; give the server a moment to process them.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn test_update_forwarded_to_other_members_only() {
    let (url, _) = start_server().await;
    let mut a = client(&url).await;
    let mut b = client(&url).await;
    let mut c = client(&url).await;
    join(&mut a, json!("doc1")).await;
    join(&mut b, json!("doc1")).await;
    join(&mut c, json!("doc2")).await;
    settle().await;

    let payload = json!({"docId": "doc1", "op": {"kind": "remove_part", "id": "p1"}});
    send(&mut a, json!({"event": "push_update", "data": payload})).await;

    let received = next_json(&mut b).await.unwrap();
    assert_eq!(received, json!({"event": "update", "data": payload}));
    assert!(next_json(&mut a).await.is_none());
    assert!(next_json(&mut c).await.is_none());
}

#[tokio::test]
async fn test_rejoin_leaves_previous_room() {
    let (url, state) = start_server().await;
    let mut a = client(&url).await;
    let mut b = client(&url).await;
    join(&mut a, json!("one")).await;
    join(&mut b, json!("one")).await;
    settle().await;
    join(&mut b, json!("two")).await;
    settle().await;
    assert_eq!(state.peer_count("one"), 1);
    assert_eq!(state.peer_count("two"), 1);

    send(&mut a, json!({"event": "push_update", "data": {"docId": "one", "n": 1}})).await;
    assert!(next_json(&mut b).await.is_none());
}

#[tokio::test]
async fn test_numeric_doc_id_and_invalid_payloads() {
    let (url, _) = start_server().await;
    let mut a = client(&url).await;
    let mut b = client(&url).await;
    join(&mut b, json!(7)).await;
    settle().await;

    send(&mut a, json!({"event": "push_update", "data": {"n": 0}})).await;
    send(&mut a, json!({"event": "bogus"})).await;
    send(&mut a, json!({"event": "push_update", "data": {"docId": 7, "n": 1}})).await;

    let received = next_json(&mut b).await.unwrap();
    assert_eq!(received["data"]["n"], json!(1));
    assert!(next_json(&mut b).await.is_none());
}

#[tokio::test]
async fn test_disconnect_cleans_up_room() {
    let (url, state) = start_server().await;
    let mut a = client(&url).await;
    join(&mut a, json!("doc")).await;
    settle().await;
    assert_eq!(state.room_count(), 1);

    a.close(None).await.unwrap();
    settle().await;
    assert_eq!(state.room_count(), 0);
}

#[tokio::test]
async fn test_health_endpoint() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let (url, _) = start_server().await;
    let addr = url.trim_start_matches("ws://").trim_end_matches("/ws");
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.ends_with("ok"));
}
