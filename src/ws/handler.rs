//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{sanitize_name, ArenaHandle, Skin};
use crate::util::rate_limit::SessionRateLimiter;
use crate::ws::protocol::{decode_client_msg, ClientMsg, ProtocolError, ServerMsg};

/// Direct replies (pong) waiting for the writer
const REPLY_BUFFER: usize = 8;

/// Query parameters for WebSocket connection
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Requested display name
    pub name: Option<String>,
    /// Skin key; unknown keys fall back to the default skin
    pub skin: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let name = sanitize_name(query.name.as_deref());
    let skin = query
        .skin
        .as_deref()
        .map(Skin::from_key)
        .unwrap_or_default();

    info!(name = %name, skin = skin.as_str(), "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, name, skin, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, name: String, skin: Skin, state: AppState) {
    let arena = state.arena.clone();
    let (session_id, outbound_rx) = arena.sessions.connect(name, skin);
    info!(session_id = %session_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (reply_tx, reply_rx) = mpsc::channel(REPLY_BUFFER);
    let limiter = SessionRateLimiter::new(state.config.input_rate_limit);

    // Either side ending closes the session
    tokio::select! {
        _ = write_loop(session_id, ws_sink, outbound_rx, reply_rx) => {
            debug!(session_id = %session_id, "Writer finished");
        }
        _ = read_loop(session_id, ws_stream, &arena, &limiter, reply_tx) => {
            debug!(session_id = %session_id, "Reader finished");
        }
    }

    arena.sessions.disconnect(session_id);
    info!(session_id = %session_id, "WebSocket connection closed");
}

/// Tick loop frames and direct replies -> WebSocket
async fn write_loop(
    session_id: Uuid,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<String>,
    mut reply_rx: mpsc::Receiver<ServerMsg>,
) {
    loop {
        let frame = tokio::select! {
            frame = outbound_rx.recv() => match frame {
                Some(frame) => frame,
                None => {
                    debug!(session_id = %session_id, "Outbound queue closed");
                    break;
                }
            },
            Some(reply) = reply_rx.recv() => match serde_json::to_string(&reply) {
                Ok(frame) => frame,
                Err(e) => {
                    error!(session_id = %session_id, error = %e, "Failed to encode reply");
                    continue;
                }
            },
        };

        if let Err(e) = ws_sink.send(Message::Text(frame)).await {
            debug!(session_id = %session_id, error = %e, "WebSocket send failed");
            break;
        }
    }

    let _ = ws_sink.close().await;
}

/// WebSocket -> intent buffer
async fn read_loop(
    session_id: Uuid,
    mut ws_stream: SplitStream<WebSocket>,
    arena: &ArenaHandle,
    limiter: &SessionRateLimiter,
    reply_tx: mpsc::Sender<ServerMsg>,
) {
    while let Some(result) = ws_stream.next().await {
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                warn!(session_id = %session_id, error = %ProtocolError::Binary, "Ignoring frame");
                continue;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "WebSocket error");
                break;
            }
        };

        if !limiter.check_frame() {
            warn!(session_id = %session_id, "Rate limited input frame");
            continue;
        }

        match decode_client_msg(&text) {
            Ok(ClientMsg::Ping { t }) => {
                if reply_tx.try_send(ServerMsg::Pong { t }).is_err() {
                    debug!(session_id = %session_id, "Reply queue full, pong dropped");
                }
            }
            Ok(msg) => {
                if let Some(intent) = msg.intent() {
                    if let Err(e) = arena.ingestor.submit(session_id, intent) {
                        warn!(session_id = %session_id, error = %e, "Rejected intent");
                    }
                }
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Failed to parse client message");
            }
        }
    }
}
