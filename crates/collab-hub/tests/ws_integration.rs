//! End-to-end tests over real loopback sockets.
//!
//! Each test starts the server on an ephemeral port and talks to it with the
//! tokio-tungstenite client, exactly as an editor client would.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use collab_hub::domain::HubConfig;
use collab_hub::infrastructure::serve;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);
const QUIET_PERIOD: Duration = Duration::from_millis(300);

// ── Helpers ───────────────────────────────────────────────────────────────────

struct TestServer {
    addr: SocketAddr,
    running: Arc<AtomicBool>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

async fn start_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    let running = Arc::new(AtomicBool::new(true));
    let config = HubConfig {
        bind_addr: addr,
        outbound_buffer: 16,
        ..HubConfig::default()
    };
    let flag = Arc::clone(&running);
    tokio::spawn(async move {
        serve(listener, config, flag).await.expect("server runs");
    });
    TestServer { addr, running }
}

async fn connect(server: &TestServer) -> Client {
    let url = format!("ws://{}/ws", server.addr);
    let (ws, _response) = connect_async(url).await.expect("websocket handshake");
    ws
}

async fn send_json(ws: &mut Client, value: Value) {
    ws.send(Message::Text(value.to_string()))
        .await
        .expect("send frame");
}

async fn recv_json(ws: &mut Client) -> Value {
    loop {
        let message = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection ended")
            .expect("websocket error");
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).expect("server sends valid json");
        }
    }
}

/// Asserts nothing arrives within a short window.
async fn assert_quiet(ws: &mut Client) {
    if let Ok(Some(Ok(Message::Text(text)))) = timeout(QUIET_PERIOD, ws.next()).await {
        panic!("unexpected frame: {text}");
    }
}

// ── Health ────────────────────────────────────────────────────────────────────

/// Writes `parts` to a fresh connection with a pause between each, then reads
/// until the server closes.
async fn http_exchange(server: &TestServer, parts: &[&[u8]]) -> String {
    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        stream.write_all(part).await.unwrap();
    }
    let mut response = String::new();
    timeout(RECV_TIMEOUT, stream.read_to_string(&mut response))
        .await
        .expect("health response in time")
        .unwrap();
    response
}

#[tokio::test]
async fn test_health_endpoint_answers_ok() {
    // Arrange
    let server = start_server().await;

    // Act
    let response = http_exchange(
        &server,
        &[b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"],
    )
    .await;

    // Assert
    assert!(response.starts_with("HTTP/1.1 200 OK"), "got: {response}");
    assert!(response.ends_with("\r\n\r\nok"), "got: {response}");
}

#[tokio::test]
async fn test_health_request_split_across_writes_answers_ok() {
    // Arrange
    let server = start_server().await;

    // Act: the request line arrives in two TCP segments
    let response = http_exchange(
        &server,
        &[
            b"GET /hea",
            b"lth HTTP/1.1\r\nHost: localhost\r\n\r\n",
        ],
    )
    .await;

    // Assert
    assert!(response.starts_with("HTTP/1.1 200 OK"), "got: {response}");
    assert!(response.ends_with("\r\n\r\nok"), "got: {response}");
}

#[tokio::test]
async fn test_plain_http_to_ws_path_is_not_upgraded() {
    let server = start_server().await;

    let response = http_exchange(
        &server,
        &[b"GET /ws HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"],
    )
    .await;

    assert!(!response.starts_with("HTTP/1.1 101"), "got: {response}");
    assert!(!response.starts_with("HTTP/1.1 200"), "got: {response}");
}

// ── Sessions ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_host_join_and_request_editor_over_websocket() {
    // Arrange
    let server = start_server().await;
    let mut a = connect(&server).await;
    let mut b = connect(&server).await;

    // Act / Assert: A hosts
    send_json(&mut a, json!({"module": "HostEditorModule", "id": "A", "room": "lvl1"})).await;
    let hosted = recv_json(&mut a).await;
    assert_eq!(hosted["module"], "HostSuccessModule");
    assert_eq!(hosted["target_id"], "A");

    // B joins; A hears nothing
    send_json(&mut b, json!({"module": "JoinEditorModule", "id": "B", "room": "lvl1"})).await;
    let joined = recv_json(&mut b).await;
    assert_eq!(joined["module"], "JoinSuccessModule");
    assert_eq!(joined["member_ids"], json!(["A", "B"]));
    assert_eq!(joined["host_id"], "A");
    assert_quiet(&mut a).await;

    // B asks the host for the level without repeating id/room
    send_json(&mut b, json!({"module": "RequestEditorModule"})).await;
    let request = recv_json(&mut a).await;
    assert_eq!(request["module"], "RequestEditorModule");
    assert_eq!(request["id"], "B");
    assert_eq!(request["room"], "lvl1");
    assert_quiet(&mut b).await;
}

#[tokio::test]
async fn test_editor_edits_are_sequenced_and_not_echoed() {
    // Arrange
    let server = start_server().await;
    let mut a = connect(&server).await;
    let mut b = connect(&server).await;
    send_json(&mut a, json!({"module": "HostEditorModule", "id": "A", "room": "lvl1"})).await;
    recv_json(&mut a).await;
    send_json(&mut b, json!({"module": "JoinEditorModule", "id": "B", "room": "lvl1"})).await;
    recv_json(&mut b).await;

    // Act: a client-chosen edit_id must be replaced
    send_json(
        &mut a,
        json!({"module": "EditorModule", "editor": {"type": "block", "edit_id": 999}}),
    )
    .await;
    send_json(&mut a, json!({"module": "EditorModule", "editor": {"type": "line"}})).await;

    // Assert
    let first = recv_json(&mut b).await;
    let second = recv_json(&mut b).await;
    assert_eq!(first["editor"]["type"], "block");
    assert_eq!(second["editor"]["type"], "line");
    let first_id = first["editor"]["edit_id"].as_u64().unwrap();
    let second_id = second["editor"]["edit_id"].as_u64().unwrap();
    assert_ne!(first_id, 999);
    assert!(second_id > first_id, "edit ids increase in submission order");
    assert!(first["editor"]["timestamp"].as_i64().unwrap() > 0);
    assert_quiet(&mut a).await;
}

#[tokio::test]
async fn test_ret_echoes_to_sender() {
    let server = start_server().await;
    let mut a = connect(&server).await;

    send_json(&mut a, json!({"module": "OnlineModule", "id": "A", "room": "lvl1", "ret": true, "pos": {"x": 1, "y": 2, "vx": 0, "vy": 0}})).await;

    let echo = recv_json(&mut a).await;
    assert_eq!(echo["module"], "OnlineModule");
    assert_eq!(echo["pos"]["y"], 2);
}

#[tokio::test]
async fn test_join_missing_room_errors_to_joiner() {
    let server = start_server().await;
    let mut b = connect(&server).await;

    send_json(&mut b, json!({"module": "JoinEditorModule", "id": "B", "room": "nowhere"})).await;

    let reply = recv_json(&mut b).await;
    assert_eq!(reply["module"], "JoinEditorModule");
    assert_eq!(reply["error"], "RoomNotFound");
}

#[tokio::test]
async fn test_invalid_frame_closes_connection() {
    // Arrange
    let server = start_server().await;
    let mut ws = connect(&server).await;

    // Act
    ws.send(Message::Text("{\"module\":\"TeleportModule\"}".to_string()))
        .await
        .unwrap();

    // Assert: the stream ends (close frame, EOF, or reset) without a reply
    let ended = timeout(RECV_TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => panic!("unexpected reply: {text}"),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(ended.is_ok(), "server must drop the client");
}
