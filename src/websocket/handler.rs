//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and drives each connection through its
//! lifecycle: registered on accept, active while frames arrive, and
//! unregistered once the stream ends, errors, or sends something other than
//! text.

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::hub::RelayHub;
use super::registry::ConnectionId;
use crate::api::AppState;

/// WebSocket upgrade handler
///
/// This is the entry point for WebSocket connections.
/// It upgrades the HTTP connection to WebSocket and starts message handling.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let hub = Arc::clone(&state.hub);
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, hub: Arc<RelayHub>) {
    let (mut sender, mut receiver) = socket.split();

    // Outbound queue for this connection; the registry keeps the sending half
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let connection_id = match hub.connect(tx).await {
        Ok((id, _uuid)) => id,
        Err(e) => {
            tracing::warn!(error = %e, "Refusing WebSocket connection");
            let _ = sender
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: e.to_string().into(),
                })))
                .await;
            return;
        }
    };

    // Task to forward queued messages to the WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                tracing::debug!(
                    connection_id = %connection_id,
                    "WebSocket send failed, closing connection"
                );
                break;
            }
        }
    });

    let hub_for_recv = Arc::clone(&hub);

    // Task to receive frames in arrival order and route them
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_ws_message(&hub_for_recv, connection_id, msg).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    // Wait for either task to complete, then for the other to stop so no
    // frame is still being routed once the connection is unregistered
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            let _ = recv_task.await;
        }
        _ = &mut recv_task => {
            send_task.abort();
            let _ = send_task.await;
        }
    }

    hub.disconnect(connection_id).await;
}

/// Handle a received WebSocket message
///
/// Returns false if the connection should be closed.
async fn handle_ws_message(hub: &RelayHub, connection_id: ConnectionId, message: Message) -> bool {
    match message {
        Message::Text(text) => {
            hub.handle_text(connection_id, &text).await;
            true
        }
        Message::Binary(_) => {
            tracing::debug!(
                connection_id = %connection_id,
                "Binary frame received, closing connection"
            );
            false
        }
        Message::Ping(_) | Message::Pong(_) => {
            // Axum answers pings itself
            true
        }
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Client requested close");
            false
        }
    }
}
