//! Real-time in-app delivery.
//!
//! [`RealtimePublisher`] persists every notification to the offline store
//! first, then pushes a `notification` frame to the user's live
//! connection if one exists. The push is a single best-effort attempt;
//! users without a connection catch up from the store on reconnect.

use std::sync::Arc;

use async_trait::async_trait;
use jobpulse_core::types::DbId;

use crate::event::Event;
use crate::store::{Notification, NotificationStore};

/// Outbound side of the connection registry, as seen by the publisher.
///
/// The API crate's WebSocket registry implements this; tests substitute
/// an in-memory double. Keeping the seam here means the engine never
/// depends on a transport.
#[async_trait]
pub trait ConnectionSink: Send + Sync {
    /// Push a message to the user's live connection, if any. Returns
    /// whether a connection was there to receive it. Single attempt, no
    /// retry: the real-time channel is time-sensitive.
    async fn send_to_user(&self, user_id: DbId, message: serde_json::Value) -> bool;

    /// Push a message to every member of a room, skipping offline members.
    async fn broadcast(&self, room_id: &str, message: serde_json::Value);
}

/// Fans events into the offline store and the live connection.
pub struct RealtimePublisher {
    sink: Arc<dyn ConnectionSink>,
    store: Arc<NotificationStore>,
}

impl RealtimePublisher {
    pub fn new(sink: Arc<dyn ConnectionSink>, store: Arc<NotificationStore>) -> Self {
        Self { sink, store }
    }

    /// Deliver one event to its user's in-app channel.
    ///
    /// The notification is stored unconditionally (unless the user muted
    /// the category) so the reconnect replay can recover it; the live
    /// push is skipped for users who disabled real-time delivery.
    pub async fn publish(&self, event: &Event) {
        let notification = Notification::from_event(event);
        let prefs = self.store.preferences(event.user_id).await;

        if prefs.muted_categories.contains(&notification.category) {
            tracing::debug!(
                user_id = event.user_id,
                category = %notification.category,
                "Notification muted by user preference"
            );
            return;
        }

        let frame = notification_frame(&notification);
        self.store.add(notification).await;

        if !prefs.realtime_enabled {
            return;
        }

        let delivered = self.sink.send_to_user(event.user_id, frame).await;
        tracing::debug!(
            user_id = event.user_id,
            event_type = %event.event_type,
            delivered,
            "Realtime notification push"
        );
    }
}

/// Build the `notification` WebSocket frame for a stored notification.
pub fn notification_frame(notification: &Notification) -> serde_json::Value {
    serde_json::json!({
        "type": "notification",
        "notification": notification,
    })
}

/// Build the `pending_notifications` replay batch sent on connect.
pub fn pending_notifications_frame(notifications: &[Notification]) -> serde_json::Value {
    serde_json::json!({
        "type": "pending_notifications",
        "notifications": notifications,
        "count": notifications.len(),
    })
}
