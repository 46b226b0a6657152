//! WebSocket upgrade handler and per-connection message loop.
//!
//! Authentication happens before the upgrade: the client passes its JWT
//! as a `?token=` query parameter (browsers cannot set headers on
//! WebSocket requests), and an invalid token rejects the handshake with
//! 401 instead of upgrading and then closing.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use jobpulse_core::error::CoreError;
use jobpulse_core::types::DbId;
use jobpulse_events::realtime::pending_notifications_frame;
use jobpulse_events::ConnectionSink;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Query parameters for the WebSocket upgrade request.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Messages a client may send over an established connection.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    /// Application-level keepalive; answered with a `pong` frame.
    Ping,
    JoinRoom {
        room: String,
    },
    LeaveRoom {
        room: String,
    },
    /// Mark the given notification ids as read; an empty list marks all.
    MarkNotificationRead {
        #[serde(default)]
        ids: Vec<Uuid>,
    },
}

/// GET /api/v1/ws
///
/// Authenticate via `?token=<jwt>`, then upgrade to WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let token = params.token.as_deref().ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized("Missing token query parameter".into()))
    })?;

    let claims = validate_token(token, &state.config.jwt).map_err(|_| {
        AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
    })?;

    let user_id = claims.sub;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

/// Manage a single authenticated WebSocket connection after upgrade.
///
/// Registers the connection (replacing any previous one for the user),
/// replays unread notifications, then processes inbound frames until the
/// client disconnects or the registry closes the channel.
async fn handle_socket(socket: WebSocket, state: AppState, user_id: DbId) {
    let (conn_id, mut rx) = state.registry.add(user_id).await;
    tracing::info!(user_id, conn_id = %conn_id, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward registry channel messages to the socket sink.
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let close = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() || close {
                break;
            }
        }
    });

    send_frame(&state, user_id, json!({ "type": "connection_confirmed" })).await;

    // Replay unread notifications accumulated while the user was offline.
    // Always sent, even when empty, so the client can settle its badge.
    let pending = state.store.unread(user_id).await;
    tracing::debug!(user_id, count = pending.len(), "Replaying pending notifications");
    send_frame(&state, user_id, pending_notifications_frame(&pending)).await;

    // Receiver loop: process inbound frames on the current task.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                state.registry.record_pong(user_id).await;
            }
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => handle_frame(&state, user_id, frame).await,
                Err(e) => {
                    tracing::debug!(user_id, error = %e, "Unparseable WebSocket frame");
                    send_frame(
                        &state,
                        user_id,
                        json!({ "type": "error", "message": "Unrecognized message" }),
                    )
                    .await;
                }
            },
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(user_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Scoped removal: a replacement connection is left untouched.
    state.registry.remove(user_id, conn_id).await;
    send_task.abort();
    tracing::info!(user_id, conn_id = %conn_id, "WebSocket disconnected");
}

/// Dispatch one parsed client frame.
async fn handle_frame(state: &AppState, user_id: DbId, frame: ClientFrame) {
    match frame {
        ClientFrame::Ping => {
            state.registry.record_pong(user_id).await;
            send_frame(state, user_id, json!({ "type": "pong" })).await;
        }
        ClientFrame::JoinRoom { room } => {
            let joined = state.registry.join_room(user_id, &room).await;
            if joined {
                send_frame(state, user_id, json!({ "type": "room_joined", "room": room })).await;
            }
        }
        ClientFrame::LeaveRoom { room } => {
            state.registry.leave_room(user_id, &room).await;
            send_frame(state, user_id, json!({ "type": "room_left", "room": room })).await;
        }
        ClientFrame::MarkNotificationRead { ids } => {
            let marked = state.store.mark_read(user_id, &ids).await;
            send_frame(
                state,
                user_id,
                json!({ "type": "notification_marked_read", "marked": marked }),
            )
            .await;
        }
    }
}

/// Push a JSON frame to the user's live connection via the registry.
async fn send_frame(state: &AppState, user_id: DbId, frame: serde_json::Value) {
    state.registry.send_to_user(user_id, frame).await;
}
