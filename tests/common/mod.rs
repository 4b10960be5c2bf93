#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use bzzr::{AppState, build_app};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{net::TcpStream, task::JoinHandle, time::timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub async fn start_test_server() -> (JoinHandle<()>, u16, Arc<AppState>) {
    start_test_server_with(AppState::new()).await
}

pub async fn start_test_server_with(state: AppState) -> (JoinHandle<()>, u16, Arc<AppState>) {
    let state = Arc::new(state);
    let app = build_app(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let port = listener
        .local_addr()
        .expect("Listener has no local address")
        .port();

    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    (server, port, state)
}

/// Creates a room over HTTP, returning (room_code, host_token).
pub async fn create_room_http(port: u16) -> (String, String) {
    let url = format!("http://127.0.0.1:{}/api/v1/rooms/create", port);
    let response = reqwest::Client::new()
        .post(&url)
        .send()
        .await
        .expect("Create room request failed");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Create room body not JSON");
    let code = body["room_code"]
        .as_str()
        .expect("Missing room_code")
        .to_string();
    let token = body["host_token"]
        .as_str()
        .expect("Missing host_token")
        .to_string();
    (code, token)
}

pub async fn connect_ws_client(port: u16, room_code: &str, query: &str) -> WsClient {
    let url = format!("ws://127.0.0.1:{}/api/v1/rooms/{}/ws{}", port, room_code, query);
    let (ws, _) = connect_async(url).await.expect("WebSocket connect failed");
    ws
}

pub async fn connect_host(port: u16, room_code: &str, host_token: &str) -> WsClient {
    connect_ws_client(port, room_code, &format!("?host_token={}", host_token)).await
}

/// Joins a new player and returns its socket and assigned id. Initial messages are consumed.
pub async fn add_player(port: u16, room_code: &str, name: &str) -> (WsClient, String) {
    let mut ws = connect_ws_client(port, room_code, &format!("?playerName={}", name)).await;
    let msgs = recv_msgs(&mut ws).await;
    let id = welcome_id(&msgs).expect("Player should receive Welcome");
    (ws, id)
}

/// Collects every JSON message that arrives until the socket goes quiet.
pub async fn recv_msgs(ws: &mut WsClient) -> Vec<Value> {
    let mut msgs = Vec::new();
    while let Ok(Some(Ok(msg))) = timeout(Duration::from_millis(200), ws.next()).await {
        if let Message::Text(text) = msg
            && let Ok(value) = serde_json::from_str::<Value>(text.as_str())
        {
            msgs.push(value);
        }
    }
    msgs
}

pub async fn send_json(ws: &mut WsClient, value: &Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("Failed to send message");
}

pub async fn send_and_recv_all(ws: &mut WsClient, value: &Value) -> Vec<Value> {
    send_json(ws, value).await;
    recv_msgs(ws).await
}

pub async fn buzz(ws: &mut WsClient) -> Vec<Value> {
    send_and_recv_all(ws, &serde_json::json!({"event": "buzz"})).await
}

pub fn welcome_id(msgs: &[Value]) -> Option<String> {
    msgs.iter()
        .find(|m| m["type"] == "Welcome")
        .and_then(|m| m["member"]["id"].as_str())
        .map(str::to_string)
}

/// The display states pushed in `msgs`, e.g. `["waiting", "armed"]`.
pub fn states(msgs: &[Value]) -> Vec<String> {
    msgs.iter()
        .filter(|m| m["type"] == "State")
        .filter_map(|m| m["state"]["state"].as_str())
        .map(str::to_string)
        .collect()
}

/// The notification events in `msgs` of the given type.
pub fn events<'a>(msgs: &'a [Value], event_type: &str) -> Vec<&'a Value> {
    msgs.iter()
        .filter(|m| m["type"] == "Event" && m["event"]["type"] == event_type)
        .map(|m| &m["event"])
        .collect()
}

pub async fn get_round(port: u16, room_code: &str) -> reqwest::Response {
    let url = format!("http://127.0.0.1:{}/api/v1/rooms/{}/round", port, room_code);
    reqwest::get(&url).await.expect("Round request failed")
}
