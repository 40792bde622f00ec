//! End-to-end tests: real server on a random port, real WebSocket clients.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use liime_core::{ChatId, InMemoryChatDirectory, UserId};
use liime_gateway::{build_router, GatewayState, PathIdentityResolver, SessionSettings};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const QUIET: Duration = Duration::from_millis(200);

async fn start_test_server(directory: Arc<InMemoryChatDirectory>) -> SocketAddr {
    start_test_server_with(directory, SessionSettings::default()).await
}

async fn start_test_server_with(
    directory: Arc<InMemoryChatDirectory>,
    settings: SessionSettings,
) -> SocketAddr {
    let state = GatewayState::new(Arc::new(PathIdentityResolver), directory, settings);
    let app = build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr, user: &str) -> Client {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws/{}", addr, user))
        .await
        .expect("WebSocket connect failed");
    ws
}

/// Connect and consume the client's own online announcement.
async fn connect_user(addr: SocketAddr, user: i64) -> Client {
    let mut ws = connect(addr, &user.to_string()).await;
    let own = next_json(&mut ws).await;
    assert_eq!(own, json!({"type": "status_change", "user_id": user, "is_online": true}));
    ws
}

/// Next text frame as JSON, skipping control frames.
async fn next_json(ws: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("receive error");
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

/// Assert no text frame arrives for a short while.
async fn expect_silence(ws: &mut Client) {
    loop {
        match tokio::time::timeout(QUIET, ws.next()).await {
            Err(_) => return,
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
            Ok(other) => panic!("expected silence, got {:?}", other),
        }
    }
}

/// Next non-pong text frame, sending an application ping whenever the line
/// goes quiet so the server keeps this connection alive.
async fn next_json_keepalive(ws: &mut Client) -> Value {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match tokio::time::timeout(Duration::from_millis(30), ws.next()).await {
                Err(_) => send_json(ws, json!({"type": "ping"})).await,
                Ok(Some(Ok(Message::Text(text)))) => {
                    let value: Value = serde_json::from_str(&text).unwrap();
                    if value["type"] != "pong" {
                        return value;
                    }
                }
                Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {}
                Ok(other) => panic!("unexpected frame: {:?}", other),
            }
        }
    })
    .await
    .expect("timed out waiting for frame")
}

async fn send_json(ws: &mut Client, value: Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

async fn expect_close_code(ws: &mut Client) -> u16 {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for close");
        match msg {
            Some(Ok(Message::Close(Some(frame)))) => return u16::from(frame.code),
            Some(Ok(Message::Text(_) | Message::Ping(_) | Message::Pong(_))) => continue,
            other => panic!("expected close frame, got {:?}", other),
        }
    }
}

async fn online_users(addr: SocketAddr) -> Vec<i64> {
    let body: Value = reqwest::get(format!("http://{}/api/users/online", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["online_users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect()
}

async fn wait_for_online(addr: SocketAddr, expected: &[i64]) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while online_users(addr).await != expected {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("online set never converged");
}

#[tokio::test]
async fn test_typing_offline_then_message_after_connect() {
    let addr = start_test_server(Arc::new(InMemoryChatDirectory::new())).await;
    let mut a = connect_user(addr, 1).await;

    // B offline: nothing happens, A stays connected.
    send_json(&mut a, json!({"type": "typing", "recipient_id": 2})).await;
    expect_silence(&mut a).await;

    let mut b = connect_user(addr, 2).await;
    assert_eq!(
        next_json(&mut a).await,
        json!({"type": "status_change", "user_id": 2, "is_online": true})
    );

    send_json(&mut a, json!({"type": "message", "recipient_id": 2, "chat_id": 7, "content": "hi"})).await;
    let frame = next_json(&mut b).await;
    assert_eq!(frame["type"], "new_message");
    assert_eq!(frame["chat_id"], 7);
    assert_eq!(frame["sender_id"], 1);
    assert_eq!(frame["content"], "hi");
    assert!(frame["timestamp"].is_string());

    expect_silence(&mut a).await;
    expect_silence(&mut b).await;
}

#[tokio::test]
async fn test_typing_relayed_to_recipient_only() {
    let addr = start_test_server(Arc::new(InMemoryChatDirectory::new())).await;
    let mut a = connect_user(addr, 1).await;
    let mut b = connect_user(addr, 2).await;
    let mut c = connect_user(addr, 3).await;
    let _ = next_json(&mut a).await; // 2 online
    let _ = next_json(&mut a).await; // 3 online
    let _ = next_json(&mut b).await; // 3 online

    send_json(&mut a, json!({"type": "typing", "recipient_id": 2})).await;
    assert_eq!(next_json(&mut b).await, json!({"type": "typing", "user_id": 1}));
    expect_silence(&mut c).await;
    expect_silence(&mut a).await;
}

#[tokio::test]
async fn test_read_is_acknowledged_to_reader() {
    let addr = start_test_server(Arc::new(InMemoryChatDirectory::new())).await;
    let mut a = connect_user(addr, 1).await;

    send_json(&mut a, json!({"type": "read", "chat_id": 4})).await;
    assert_eq!(
        next_json(&mut a).await,
        json!({"type": "read_receipt", "chat_id": 4, "user_id": 1})
    );
}

#[tokio::test]
async fn test_application_ping() {
    let addr = start_test_server(Arc::new(InMemoryChatDirectory::new())).await;
    let mut a = connect_user(addr, 1).await;

    send_json(&mut a, json!({"type": "ping"})).await;
    assert_eq!(next_json(&mut a).await, json!({"type": "pong"}));
}

#[tokio::test]
async fn test_group_message_fans_out() {
    let directory = Arc::new(InMemoryChatDirectory::new());
    directory
        .set_members(ChatId(10), [UserId(1), UserId(2), UserId(3)])
        .await;
    let addr = start_test_server(directory).await;

    let mut a = connect_user(addr, 1).await;
    let mut b = connect_user(addr, 2).await;
    let mut c = connect_user(addr, 3).await;
    let _ = next_json(&mut a).await;
    let _ = next_json(&mut a).await;
    let _ = next_json(&mut b).await;

    send_json(&mut a, json!({"type": "message", "recipient_id": 2, "chat_id": 10, "content": "all"})).await;
    assert_eq!(next_json(&mut b).await["content"], "all");
    assert_eq!(next_json(&mut c).await["content"], "all");
    expect_silence(&mut a).await;
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection() {
    let addr = start_test_server(Arc::new(InMemoryChatDirectory::new())).await;
    let mut a = connect_user(addr, 1).await;
    let mut b = connect_user(addr, 2).await;
    let _ = next_json(&mut a).await;

    a.send(Message::Text("{not json".into())).await.unwrap();
    send_json(&mut a, json!({"type": "teleport"})).await;
    send_json(&mut a, json!({"type": "typing", "recipient_id": 2})).await;

    assert_eq!(next_json(&mut b).await, json!({"type": "typing", "user_id": 1}));
}

#[tokio::test]
async fn test_messages_arrive_in_send_order() {
    let addr = start_test_server(Arc::new(InMemoryChatDirectory::new())).await;
    let mut a = connect_user(addr, 1).await;
    let mut b = connect_user(addr, 2).await;
    let _ = next_json(&mut a).await;

    for i in 0..50 {
        send_json(&mut a, json!({"type": "message", "recipient_id": 2, "chat_id": 1, "content": i.to_string()})).await;
    }
    for i in 0..50 {
        assert_eq!(next_json(&mut b).await["content"], i.to_string());
    }
}

#[tokio::test]
async fn test_reconnect_supersedes_silently() {
    let addr = start_test_server(Arc::new(InMemoryChatDirectory::new())).await;
    let mut watcher = connect_user(addr, 9).await;
    let mut first = connect_user(addr, 1).await;
    assert_eq!(next_json(&mut watcher).await["user_id"], 1);

    // Same identity again: the old socket is closed, nobody sees a flicker.
    let mut second = connect(addr, "1").await;
    assert_eq!(expect_close_code(&mut first).await, 4000);
    expect_silence(&mut watcher).await;
    assert_eq!(online_users(addr).await, vec![1, 9]);

    // The live connection is the new one.
    send_json(&mut watcher, json!({"type": "typing", "recipient_id": 1})).await;
    assert_eq!(next_json(&mut second).await, json!({"type": "typing", "user_id": 9}));

    second.close(None).await.unwrap();
    assert_eq!(
        next_json(&mut watcher).await,
        json!({"type": "status_change", "user_id": 1, "is_online": false})
    );
    wait_for_online(addr, &[9]).await;
}

#[tokio::test]
async fn test_disconnect_broadcasts_offline_once() {
    let addr = start_test_server(Arc::new(InMemoryChatDirectory::new())).await;
    let mut a = connect_user(addr, 1).await;
    let mut b = connect_user(addr, 2).await;
    let _ = next_json(&mut a).await;

    b.close(None).await.unwrap();
    assert_eq!(
        next_json(&mut a).await,
        json!({"type": "status_change", "user_id": 2, "is_online": false})
    );
    expect_silence(&mut a).await;
    wait_for_online(addr, &[1]).await;
}

#[tokio::test]
async fn test_invalid_identity_is_closed_without_registering() {
    let addr = start_test_server(Arc::new(InMemoryChatDirectory::new())).await;
    let mut a = connect_user(addr, 1).await;

    let mut bad = connect(addr, "alice").await;
    assert_eq!(expect_close_code(&mut bad).await, 4002);
    expect_silence(&mut a).await;
    assert_eq!(online_users(addr).await, vec![1]);
}

#[tokio::test]
async fn test_health_reports_counters() {
    let addr = start_test_server(Arc::new(InMemoryChatDirectory::new())).await;
    let mut a = connect_user(addr, 1).await;
    send_json(&mut a, json!({"type": "typing", "recipient_id": 2})).await;
    expect_silence(&mut a).await;

    let health: Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["online"], 1);
    assert_eq!(health["delivery"]["dropped_offline"], 1);
    assert_eq!(health["delivery"]["connections_active"], 1);
}

#[tokio::test]
async fn test_idle_connection_times_out_and_goes_offline() {
    // The first heartbeat tick already exceeds the idle limit, so the idle
    // client is closed before any server ping is queued for it.
    let settings = SessionSettings {
        heartbeat_interval: Duration::from_millis(150),
        ping_timeout: Duration::from_millis(100),
        ..SessionSettings::default()
    };
    let addr = start_test_server_with(Arc::new(InMemoryChatDirectory::new()), settings).await;

    let mut watcher = connect_user(addr, 9).await;
    let mut idle = connect(addr, "1").await;
    assert_eq!(
        next_json_keepalive(&mut watcher).await,
        json!({"type": "status_change", "user_id": 1, "is_online": true})
    );

    // The idle client never reads or writes.
    assert_eq!(
        next_json_keepalive(&mut watcher).await,
        json!({"type": "status_change", "user_id": 1, "is_online": false})
    );
    assert_eq!(online_users(addr).await, vec![9]);

    assert_eq!(expect_close_code(&mut idle).await, 1001);
}
