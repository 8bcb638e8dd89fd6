//! WebSocket server: HTTP routing, health check, and per-client sessions.
//!
//! This module is responsible for:
//!
//! 1. Starting the coordination loop.
//! 2. Serving an axum router on the configured listener:
//!    - `GET /health` answers `200` with body `ok` and closes the connection.
//!    - Any other path is a WebSocket upgrade (clients use `/ws`).
//! 3. Running two paths per session:
//!    - **Read path**: decodes text frames, fills sticky `id`/`room`, stamps
//!      editor frames, and submits them to the loop.
//!    - **Write path**: drains the client's outbox into the socket.
//! 4. Stopping the server when the `running` flag is cleared.
//!
//! # Request parsing
//!
//! hyper (via axum) reads every request head, so a request line split across
//! TCP segments (`GET /hea` then `lth HTTP/1.1 ...`) still routes to
//! `/health`.  The WebSocket handshake is parsed the same way.
//!
//! # Session teardown
//!
//! A session ends when either path ends.  The read path ends on a close
//! frame, a read error, or a frame that does not decode.  The write path ends
//! when the loop drops the client's outbox (slow consumer) or a socket write
//! fails.  Either way the session unregisters itself and both socket halves
//! are dropped.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use collab_core::{decode_update, SequenceCounter};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::hub::{spawn_hub, HubHandle};
use crate::application::registry::ConnectionId;
use crate::domain::config::HubConfig;
use crate::infrastructure::session::StickySession;

type WsSink = SplitSink<WebSocket, WsMessage>;

/// How often the server re-checks the `running` flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Body of a successful health check.
const HEALTH_BODY: &str = "ok";

/// Shared by every request handler.
#[derive(Clone)]
struct ServerState {
    hub: HubHandle,
    edits: Arc<SequenceCounter>,
    outbound_buffer: usize,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.bind_addr` and serves until `running` is set to `false`.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound (port in use, missing
/// permission).
pub async fn run_server(config: HubConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind listener on {}", config.bind_addr))?;
    serve(listener, config, running).await
}

/// Serves on an already-bound listener.
///
/// Integration tests bind port 0 themselves and pass the listener in.
pub async fn serve(
    listener: TcpListener,
    config: HubConfig,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let config = config.normalized();
    let local = listener
        .local_addr()
        .context("listener has no local address")?;
    info!("collaboration hub listening on {local} (ws + /health)");

    let edits = Arc::new(SequenceCounter::new());
    let (hub, _hub_task) = spawn_hub(&config, Arc::clone(&edits));
    let app = router(ServerState {
        hub,
        edits,
        outbound_buffer: config.outbound_buffer,
    });

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_requested(running))
    .await
    .context("HTTP server failed")
}

// ── Routing ───────────────────────────────────────────────────────────────────

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .fallback(upgrade)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    ([(header::CONNECTION, "close")], HEALTH_BODY)
}

async fn upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<ServerState>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        match run_session(socket, peer, state).await {
            Ok(()) => info!("session {peer} closed"),
            Err(e) => warn!("session {peer} closed with error: {e:#}"),
        }
    })
}

/// Resolves once `running` has been cleared.
async fn shutdown_requested(running: Arc<AtomicBool>) {
    while running.load(Ordering::Relaxed) {
        tokio::time::sleep(SHUTDOWN_POLL).await;
    }
    info!("shutdown flag set; stopping server");
}

// ── Per-connection session ────────────────────────────────────────────────────

/// Runs one WebSocket session from register to unregister.
async fn run_session(
    socket: WebSocket,
    peer: SocketAddr,
    state: ServerState,
) -> anyhow::Result<()> {
    let ServerState {
        hub,
        edits,
        outbound_buffer,
    } = state;

    let id: ConnectionId = Uuid::new_v4();
    let (outbox, frames) = mpsc::channel::<Arc<str>>(outbound_buffer);
    hub.register(id, outbox)
        .await
        .context("coordination loop is not running")?;
    info!(client = %id, "session established with {peer}");

    let (sink, source) = socket.split();
    let mut writer = tokio::spawn(write_path(sink, frames, id));

    let result = tokio::select! {
        res = read_path(source, &hub, id, &edits) => {
            writer.abort();
            res
        }
        _ = &mut writer => {
            debug!(client = %id, "write path ended");
            Ok(())
        }
    };

    if hub.unregister(id).await.is_err() {
        debug!(client = %id, "coordination loop already stopped");
    }
    result
}

/// Decodes, fills, stamps, and submits every text frame until the client
/// goes away.
///
/// A read error (including a reset without a close handshake) ends the
/// session with an error.
async fn read_path<S, E>(
    mut source: S,
    hub: &HubHandle,
    id: ConnectionId,
    edits: &SequenceCounter,
) -> anyhow::Result<()>
where
    S: Stream<Item = Result<WsMessage, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut session = StickySession::new();

    while let Some(message) = source.next().await {
        let message = message.with_context(|| format!("WebSocket read from {id} failed"))?;

        match message {
            WsMessage::Text(text) => {
                let update = decode_update(&text)
                    .with_context(|| format!("client {id} sent an invalid frame"))?;
                debug!(client = %id, module = %update.module, "received");
                let update = session.prepare(update, edits);
                hub.submit(id, update).await?;
            }
            WsMessage::Binary(data) => {
                debug!(client = %id, "ignoring binary frame ({} bytes)", data.len());
            }
            WsMessage::Close(_) => {
                debug!(client = %id, "close frame received");
                break;
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) => {}
        }
    }
    Ok(())
}

/// Drains the client's outbox into the socket.
async fn write_path(mut sink: WsSink, mut frames: mpsc::Receiver<Arc<str>>, id: ConnectionId) {
    while let Some(frame) = frames.recv().await {
        if let Err(e) = sink.send(WsMessage::Text(frame.to_string())).await {
            debug!(client = %id, "write failed: {e}");
            return;
        }
    }
    // Outbox dropped by the loop: this client was removed.
    if let Err(e) = sink.close().await {
        debug!(client = %id, "close failed: {e}");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::hub::Hub;
    use axum::http::StatusCode;
    use futures_util::stream;
    use std::io;
    use tokio::time::timeout;
    use tokio_test::{assert_err, assert_ok};

    fn make_hub() -> (Hub, HubHandle) {
        Hub::new(&HubConfig::default(), Arc::new(SequenceCounter::new()))
    }

    fn text(json: &str) -> Result<WsMessage, io::Error> {
        Ok(WsMessage::Text(json.to_string()))
    }

    #[tokio::test]
    async fn test_health_answers_ok_and_closes() {
        // Act
        let response = health().await.into_response();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONNECTION], "close");
        let body = axum::body::to_bytes(response.into_body(), 64)
            .await
            .expect("body fits");
        assert_eq!(&body[..], HEALTH_BODY.as_bytes());
    }

    #[tokio::test]
    async fn test_shutdown_resolves_after_flag_cleared() {
        // Arrange
        let running = Arc::new(AtomicBool::new(true));
        let signal = tokio::spawn(shutdown_requested(Arc::clone(&running)));

        // Act
        running.store(false, Ordering::Relaxed);

        // Assert
        let finished = timeout(SHUTDOWN_POLL * 5, signal).await;
        assert!(finished.is_ok(), "shutdown must fire within a few polls");
    }

    #[tokio::test]
    async fn test_shutdown_waits_while_running() {
        let running = Arc::new(AtomicBool::new(true));

        let pending = timeout(SHUTDOWN_POLL * 2, shutdown_requested(running)).await;

        assert!(pending.is_err(), "server must keep serving while running");
    }

    #[tokio::test]
    async fn test_read_error_ends_session_with_error() {
        // Arrange: the peer vanishes without a close handshake
        let (_hub, handle) = make_hub();
        let source = stream::iter(vec![
            text(r#"{"module":"OnlineModule","id":"A","room":"lvl1"}"#),
            Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "reset without closing handshake",
            )),
        ]);

        // Act
        let result = read_path(source, &handle, Uuid::new_v4(), &SequenceCounter::new()).await;

        // Assert
        let err = assert_err!(result);
        assert!(format!("{err:#}").contains("reset without closing handshake"));
    }

    #[tokio::test]
    async fn test_close_frame_ends_session_cleanly() {
        let (_hub, handle) = make_hub();
        let source = stream::iter(vec![Ok(WsMessage::Close(None)), text("not json")]);

        let result = read_path(source, &handle, Uuid::new_v4(), &SequenceCounter::new()).await;

        assert_ok!(result);
    }

    #[tokio::test]
    async fn test_invalid_frame_ends_session_with_error() {
        let (_hub, handle) = make_hub();
        let source = stream::iter(vec![text(r#"{"module":"TeleportModule"}"#)]);

        let result = read_path(source, &handle, Uuid::new_v4(), &SequenceCounter::new()).await;

        assert_err!(result);
    }
}
