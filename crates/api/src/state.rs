use std::sync::Arc;

use jobpulse_events::webhook::{DeliveryLog, DeliverySender, SubscriptionStore};
use jobpulse_events::{EventDispatcher, NotificationStore};

use crate::config::ServerConfig;
use crate::ws::WsRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// WebSocket connection registry (one live connection per user).
    pub registry: Arc<WsRegistry>,
    /// Offline notification store (REST surface + reconnect replay).
    pub store: Arc<NotificationStore>,
    /// Per-user webhook subscription configuration.
    pub subscriptions: Arc<SubscriptionStore>,
    /// Webhook delivery history, queryable by the subscription owner.
    pub delivery_log: Arc<DeliveryLog>,
    /// Signing HTTP sender, shared with the worker for the send-test path.
    pub sender: Arc<DeliverySender>,
    /// Entry point for publishing events into both delivery channels.
    pub dispatcher: Arc<EventDispatcher>,
}
