//! WebSocket upgrade handler

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::arena::SESSION_QUEUE_SIZE;
use crate::game::{ArenaHandle, SessionEvent, SessionEventKind};
use crate::util::rate_limit::SessionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let connection_id = Uuid::new_v4();
    debug!(connection_id = %connection_id, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, connection_id, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, connection_id: Uuid, state: AppState) {
    info!(connection_id = %connection_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel(SESSION_QUEUE_SIZE);
    let snapshot_rx = state.arena.subscribe();

    let attach = SessionEvent::new(
        connection_id,
        SessionEventKind::Connect {
            outbound: outbound_tx,
        },
    );
    if let Err(e) = state.arena.send(attach).await {
        error!(connection_id = %connection_id, error = %e, "Failed to attach session");
        return;
    }

    run_session(
        connection_id,
        ws_sink,
        ws_stream,
        &state.arena,
        outbound_rx,
        snapshot_rx,
    )
    .await;

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    connection_id: Uuid,
    ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    arena: &ArenaHandle,
    outbound_rx: mpsc::Receiver<Arc<ServerMsg>>,
    snapshot_rx: broadcast::Receiver<Arc<ServerMsg>>,
) {
    let rate_limiter = SessionRateLimiter::new();
    let writer_handle = tokio::spawn(write_loop(connection_id, ws_sink, outbound_rx, snapshot_rx));

    // Reader loop: WebSocket -> arena
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(connection_id = %connection_id, "Rate limited client message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(ClientMsg::Chat { .. }) if !rate_limiter.check_chat() => {
                        warn!(connection_id = %connection_id, "Rate limited chat message");
                    }
                    Ok(msg) => {
                        let event = SessionEvent::new(connection_id, SessionEventKind::Client(msg));
                        if arena.send(event).await.is_err() {
                            debug!(connection_id = %connection_id, "Arena channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Remove the player right away
    let _ = arena
        .send(SessionEvent::new(connection_id, SessionEventKind::Disconnect))
        .await;

    writer_handle.abort();
}

/// Writer task: unicast replies first, then broadcast frames
async fn write_loop(
    connection_id: Uuid,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Arc<ServerMsg>>,
    mut snapshot_rx: broadcast::Receiver<Arc<ServerMsg>>,
) {
    loop {
        let msg = tokio::select! {
            biased;
            unicast = outbound_rx.recv() => match unicast {
                Some(msg) => msg,
                None => break,
            },
            frame = snapshot_rx.recv() => match frame {
                Ok(msg) => msg,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        connection_id = %connection_id,
                        lagged_count = n,
                        "Client lagged, skipping {} frames", n
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(connection_id = %connection_id, "Broadcast channel closed");
                    break;
                }
            },
        };

        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
