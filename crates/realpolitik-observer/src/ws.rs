//! `WebSocket` handler for live turn summaries.
//!
//! Clients connect to `GET /ws/turns` and receive a JSON [`TurnBroadcast`]
//! text frame after every completed turn. A client that falls behind skips
//! to the newest summary.
//!
//! [`TurnBroadcast`]: crate::state::TurnBroadcast

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade to a `WebSocket` and stream turn summaries.
///
/// # Route
///
/// `GET /ws/turns`
pub async fn ws_turns(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("Turn stream client connected");
    let mut rx = state.subscribe();

    loop {
        tokio::select! {
            result = rx.recv() => match result {
                Ok(turn) => {
                    let json = match serde_json::to_string(&turn) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(error = %e, "Failed to serialize turn broadcast");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(json.into())).await.is_err() {
                        debug!("Turn stream client disconnected (send failed)");
                        return;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Turn stream client lagged, skipping ahead");
                }
                Err(RecvError::Closed) => {
                    debug!("Broadcast channel closed, closing turn stream");
                    return;
                }
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Close(_)) | Err(_)) | None => {
                    debug!("Turn stream client disconnected");
                    return;
                }
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        return;
                    }
                }
                // Client text and binary frames are ignored.
                Some(Ok(_)) => {}
            },
        }
    }
}
