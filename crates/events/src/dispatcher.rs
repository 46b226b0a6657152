//! Single entry point for event distribution.
//!
//! Producers call [`EventDispatcher::publish`] and move on: the call is
//! fire-and-forget, and a failure in one delivery channel can neither
//! reach the caller nor affect the other channel.

use std::sync::Arc;

use crate::event::Event;
use crate::realtime::RealtimePublisher;
use crate::webhook::queue::{EnqueueError, WebhookQueue};

/// Fans one event out to the real-time channel and the webhook queue.
pub struct EventDispatcher {
    realtime: Arc<RealtimePublisher>,
    webhooks: Arc<WebhookQueue>,
}

impl EventDispatcher {
    pub fn new(realtime: Arc<RealtimePublisher>, webhooks: Arc<WebhookQueue>) -> Self {
        Self { realtime, webhooks }
    }

    /// Publish an event to both channels.
    ///
    /// The event type is a closed enum, so only the target user needs
    /// validating. The real-time push runs on a supervised spawned task;
    /// the webhook enqueue is synchronous but non-blocking (`try_send`
    /// under the hood). Neither outcome is reported to the caller —
    /// webhook failures surface in the delivery log, real-time failures
    /// are absorbed by the offline store.
    pub async fn publish(&self, event: Event) {
        if event.user_id <= 0 {
            tracing::warn!(
                event_type = %event.event_type,
                user_id = event.user_id,
                "Dropping event with no valid target user"
            );
            return;
        }

        // Real-time channel: spawned so a slow store/sink cannot delay
        // the webhook enqueue or the caller.
        let realtime = Arc::clone(&self.realtime);
        let realtime_event = event.clone();
        tokio::spawn(async move {
            realtime.publish(&realtime_event).await;
        });

        // Webhook channel: rejections here are expected (most users have
        // no webhook) and only logged.
        match self.webhooks.enqueue(&event).await {
            Ok(_) => {}
            Err(EnqueueError::NotConfigured) | Err(EnqueueError::Disabled) => {
                tracing::debug!(
                    event_type = %event.event_type,
                    user_id = event.user_id,
                    "Event not queued for webhook delivery"
                );
            }
            Err(e @ EnqueueError::QueueFull) => {
                tracing::error!(
                    event_type = %event.event_type,
                    user_id = event.user_id,
                    error = %e,
                    "Webhook delivery rejected under backpressure"
                );
            }
        }
    }
}
