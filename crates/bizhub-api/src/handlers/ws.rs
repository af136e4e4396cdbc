//! WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use bizhub_realtime::message::serializer::serialize_outbound;
use bizhub_realtime::{AuthenticatedConnection, ConnectionHandle, OutboundMessage};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameter for WebSocket authentication.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// JWT access token.
    pub token: Option<String>,
}

/// GET /ws?token={jwt}
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    // Authenticate before upgrade
    let auth = state.realtime.authenticate(query.token.as_deref())?;
    let max_size = state.config.realtime.max_message_size;

    Ok(ws
        .max_message_size(max_size)
        .on_upgrade(move |socket| handle_ws_connection(state, auth, socket)))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, auth: AuthenticatedConnection, socket: WebSocket) {
    let (ws_tx, mut ws_rx) = socket.split();

    let (handle, outbound_rx) = state.realtime.connections.register(&auth);
    let conn_id = handle.id;

    let mut writer = tokio::spawn(write_outbound(ws_tx, outbound_rx, Arc::clone(&handle)));
    let heartbeat = state.realtime.spawn_heartbeat(Arc::clone(&handle));

    let reader = async {
        while let Some(result) = ws_rx.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    state.realtime.handle_text(&conn_id, text.as_str()).await;
                }
                Ok(Message::Close(_)) => break,
                // Protocol-level ping/pong is answered by axum.
                Ok(_) => {}
                Err(e) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    };

    // Either side ending ends the connection.
    tokio::select! {
        _ = reader => {}
        _ = &mut writer => {}
    }

    writer.abort();
    heartbeat.abort();
    state.realtime.connections.unregister(&conn_id);

    info!(
        conn_id = %conn_id,
        user_id = %auth.user_id,
        "WebSocket connection closed"
    );
}

/// Forwards queued messages to the socket until the connection is closed.
async fn write_outbound(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<OutboundMessage>,
    handle: Arc<ConnectionHandle>,
) {
    loop {
        tokio::select! {
            msg = outbound_rx.recv() => {
                let Some(msg) = msg else { break };
                let text = match serialize_outbound(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(conn_id = %handle.id, error = %e, "Dropping unserializable message");
                        continue;
                    }
                };
                if ws_tx.send(Message::Text(text.into())).await.is_err() {
                    handle.mark_dead();
                    break;
                }
            }
            _ = handle.closed() => {
                debug!(conn_id = %handle.id, "Closing connection from server side");
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
        }
    }
}
