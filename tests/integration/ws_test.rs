//! Integration tests for WebSocket connection and messaging.

mod helpers;

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use http::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use bizhub_entity::user::UserRole;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: SocketAddr, token: &str) -> Socket {
    let (socket, _) = connect_async(format!("ws://{addr}/ws?token={token}"))
        .await
        .expect("WebSocket handshake failed");
    socket
}

/// Next JSON text frame, failing after a few seconds.
async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("Timed out waiting for a message")
            .expect("Socket closed")
            .expect("Socket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("Invalid JSON frame");
        }
    }
}

async fn send_json(socket: &mut Socket, value: Value) {
    socket
        .send(Message::Text(value.to_string().into()))
        .await
        .expect("Failed to send frame");
}

#[tokio::test]
async fn test_ws_upgrade_without_token() {
    let app = helpers::TestApp::new();
    let addr = app.spawn().await;

    for url in [
        format!("ws://{addr}/ws"),
        format!("ws://{addr}/ws?token=forged"),
    ] {
        match connect_async(url).await {
            Err(WsError::Http(response)) => {
                assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            }
            Err(e) => panic!("expected 401, got {e}"),
            Ok(_) => panic!("expected 401, handshake succeeded"),
        }
    }
}

#[tokio::test]
async fn test_connected_ack_and_live_notification() {
    let app = helpers::TestApp::new();
    let admin = app.create_test_user("root", UserRole::Admin);
    let token = app.token_for(&admin);
    let addr = app.spawn().await;

    let mut socket = connect(addr, &token).await;
    let ack = next_json(&mut socket).await;
    assert_eq!(ack["type"], "connected");
    assert_eq!(ack["user_id"], admin.id.to_string());
    assert_eq!(ack["role"], "admin");

    let response = app
        .request("POST", "/api/admin/notifications/test", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let id = response.data()["notification"]["id"].clone();

    let pushed = next_json(&mut socket).await;
    assert_eq!(pushed["type"], "notification");
    assert_eq!(pushed["notification"]["id"], id);
    assert_eq!(pushed["notification"]["is_read"], Value::Bool(false));

    send_json(&mut socket, json!({ "type": "mark_read", "notification_id": id })).await;
    let read = next_json(&mut socket).await;
    assert_eq!(read["type"], "notification_read");
    assert_eq!(read["notification_id"], id);
    assert_eq!(read["unread_count"], 0);
}

#[tokio::test]
async fn test_read_state_syncs_across_connections() {
    let app = helpers::TestApp::new();
    let admin = app.create_test_user("root", UserRole::Admin);
    let token = app.token_for(&admin);
    let addr = app.spawn().await;

    let mut first = connect(addr, &token).await;
    let mut second = connect(addr, &token).await;
    assert_eq!(next_json(&mut first).await["type"], "connected");
    assert_eq!(next_json(&mut second).await["type"], "connected");

    app.request("POST", "/api/admin/notifications/test", None, Some(&token))
        .await;
    assert_eq!(next_json(&mut first).await["type"], "notification");
    assert_eq!(next_json(&mut second).await["type"], "notification");

    send_json(&mut first, json!({ "type": "mark_all_read" })).await;
    for socket in [&mut first, &mut second] {
        let event = next_json(socket).await;
        assert_eq!(event["type"], "notifications_all_read");
        assert_eq!(event["updated"], 1);
        assert_eq!(event["unread_count"], 0);
    }
}

#[tokio::test]
async fn test_malformed_message_gets_error() {
    let app = helpers::TestApp::new();
    let user = app.create_test_user("sam", UserRole::Staff);
    let token = app.token_for(&user);
    let addr = app.spawn().await;

    let mut socket = connect(addr, &token).await;
    next_json(&mut socket).await;

    send_json(&mut socket, json!({ "type": "subscribe", "channel": "all" })).await;
    let error = next_json(&mut socket).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "INVALID_MESSAGE");

    // The connection stays usable.
    send_json(&mut socket, json!({ "type": "mark_all_read" })).await;
    assert_eq!(next_json(&mut socket).await["type"], "notifications_all_read");
}

#[tokio::test]
async fn test_health_counts_connections() {
    let app = helpers::TestApp::new();
    let user = app.create_test_user("sam", UserRole::Staff);
    let token = app.token_for(&user);
    let addr = app.spawn().await;

    let mut socket = connect(addr, &token).await;
    next_json(&mut socket).await;

    let response = app.request("GET", "/api/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["status"], "ok");
    assert_eq!(response.data()["ws_connections"], 1);
    assert_eq!(response.data()["online_users"], 1);
}
