use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::ws::{Message, Utf8Bytes};
use jobpulse_core::types::{DbId, Timestamp};
use jobpulse_events::ConnectionSink;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single user's WebSocket connection.
pub struct UserConnection {
    /// Distinguishes this connection from a replacement for the same user,
    /// so a stale socket task cannot tear down its successor on exit.
    pub conn_id: Uuid,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
    /// Last time a Pong frame arrived; stale connections are evicted.
    pub last_pong: Instant,
    /// Rooms this connection has joined.
    pub rooms: HashSet<String>,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<DbId, UserConnection>,
    rooms: HashMap<String, HashSet<DbId>>,
}

impl Inner {
    /// Drop a user from the given room memberships, removing rooms that
    /// become empty.
    fn detach_rooms(&mut self, user_id: DbId, rooms: &HashSet<String>) {
        for room in rooms {
            if let Some(members) = self.rooms.get_mut(room) {
                members.remove(&user_id);
                if members.is_empty() {
                    self.rooms.remove(room);
                }
            }
        }
    }
}

/// Manages all active WebSocket connections, at most one per user.
///
/// A second connect for the same user replaces the first: the old socket
/// receives a Close frame and its room memberships are cleared. Thread-safe
/// via interior `RwLock`; designed to be wrapped in `Arc` and shared.
pub struct WsRegistry {
    inner: RwLock<Inner>,
}

impl WsRegistry {
    /// Create a new, empty connection registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Register a connection for a user, replacing any existing one.
    ///
    /// Returns the connection id (for scoped removal on disconnect) and
    /// the receiver half of the outbound message channel.
    pub async fn add(&self, user_id: DbId) -> (Uuid, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = UserConnection {
            conn_id: Uuid::new_v4(),
            sender: tx,
            connected_at: chrono::Utc::now(),
            last_pong: Instant::now(),
            rooms: HashSet::new(),
        };
        let conn_id = conn.conn_id;

        let mut inner = self.inner.write().await;
        if let Some(old) = inner.connections.insert(user_id, conn) {
            let _ = old.sender.send(Message::Close(None));
            let old_rooms = old.rooms;
            inner.detach_rooms(user_id, &old_rooms);
            tracing::info!(user_id, "Replaced existing WebSocket connection");
        }
        (conn_id, rx)
    }

    /// Remove a user's connection, but only if it is still the one
    /// identified by `conn_id`. A replaced connection's cleanup is a no-op.
    pub async fn remove(&self, user_id: DbId, conn_id: Uuid) {
        let mut inner = self.inner.write().await;
        let matches = inner
            .connections
            .get(&user_id)
            .is_some_and(|c| c.conn_id == conn_id);
        if !matches {
            return;
        }
        if let Some(conn) = inner.connections.remove(&user_id) {
            inner.detach_rooms(user_id, &conn.rooms);
        }
    }

    /// Add a user's connection to a room. Returns `false` if the user has
    /// no live connection.
    pub async fn join_room(&self, user_id: DbId, room: &str) -> bool {
        let mut inner = self.inner.write().await;
        let Some(conn) = inner.connections.get_mut(&user_id) else {
            return false;
        };
        conn.rooms.insert(room.to_string());
        inner.rooms.entry(room.to_string()).or_default().insert(user_id);
        true
    }

    /// Remove a user's connection from a room. Returns whether the user
    /// was a member.
    pub async fn leave_room(&self, user_id: DbId, room: &str) -> bool {
        let mut inner = self.inner.write().await;
        let Some(conn) = inner.connections.get_mut(&user_id) else {
            return false;
        };
        if !conn.rooms.remove(room) {
            return false;
        }
        if let Some(members) = inner.rooms.get_mut(room) {
            members.remove(&user_id);
            if members.is_empty() {
                inner.rooms.remove(room);
            }
        }
        true
    }

    /// Record a Pong from the user's connection, refreshing its liveness.
    pub async fn record_pong(&self, user_id: DbId) {
        let mut inner = self.inner.write().await;
        if let Some(conn) = inner.connections.get_mut(&user_id) {
            conn.last_pong = Instant::now();
        }
    }

    /// Whether the user currently has a live connection.
    pub async fn is_connected(&self, user_id: DbId) -> bool {
        self.inner.read().await.connections.contains_key(&user_id)
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Send a Ping frame to every connected client.
    ///
    /// Used by the heartbeat task to keep connections alive and refresh
    /// `last_pong` via the replies.
    pub async fn ping_all(&self) {
        let inner = self.inner.read().await;
        for conn in inner.connections.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }

    /// Evict connections whose last Pong is older than `max_idle`.
    ///
    /// Each evicted socket receives a Close frame. Returns the number of
    /// connections removed.
    pub async fn evict_stale(&self, max_idle: Duration) -> usize {
        let mut inner = self.inner.write().await;
        let stale: Vec<DbId> = inner
            .connections
            .iter()
            .filter(|(_, conn)| conn.last_pong.elapsed() > max_idle)
            .map(|(user_id, _)| *user_id)
            .collect();

        for user_id in &stale {
            if let Some(conn) = inner.connections.remove(user_id) {
                let _ = conn.sender.send(Message::Close(None));
                inner.detach_rooms(*user_id, &conn.rooms);
                tracing::info!(user_id, "Evicted stale WebSocket connection");
            }
        }
        stale.len()
    }

    /// Send a Close frame to every connection, then clear the registry.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut inner = self.inner.write().await;
        let count = inner.connections.len();
        for conn in inner.connections.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        inner.connections.clear();
        inner.rooms.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }
}

impl Default for WsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionSink for WsRegistry {
    async fn send_to_user(&self, user_id: DbId, message: serde_json::Value) -> bool {
        let inner = self.inner.read().await;
        match inner.connections.get(&user_id) {
            Some(conn) => conn
                .sender
                .send(Message::Text(message.to_string().into()))
                .is_ok(),
            None => false,
        }
    }

    async fn broadcast(&self, room_id: &str, message: serde_json::Value) {
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(room_id) else {
            return;
        };
        let text: Utf8Bytes = message.to_string().into();
        for user_id in members {
            if let Some(conn) = inner.connections.get(user_id) {
                let _ = conn.sender.send(Message::Text(text.clone()));
            }
        }
    }
}
