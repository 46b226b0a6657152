//! Webhook delivery queue.
//!
//! Jobs enter here on publish and are drained FIFO by a single
//! [`DeliveryWorker`](crate::webhook::worker::DeliveryWorker). The queue
//! is bounded; when it is full new work is rejected rather than buffered
//! without limit against an unreachable receiver.

use std::sync::Arc;

use jobpulse_core::types::DbId;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::event::Event;
use crate::webhook::subscription::SubscriptionStore;

/// Default queue capacity; enqueues beyond this are rejected.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Default number of delivery attempts before a job fails terminally.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Lifecycle of a delivery job.
///
/// `Pending → InFlight → Succeeded`, or on failure
/// `InFlight → RetryScheduled → Pending` while attempts remain, else
/// `InFlight → FailedTerminal`. Terminal states drop the job after one
/// delivery-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    InFlight,
    Succeeded,
    RetryScheduled,
    FailedTerminal,
}

/// One webhook delivery in progress.
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    /// Delivery id, sent as `X-Webhook-Delivery` on every attempt so
    /// receivers can deduplicate at-least-once delivery.
    pub id: Uuid,
    /// Owner of the subscription; the worker re-resolves the current
    /// subscription from this id before each attempt.
    pub user_id: DbId,
    pub event: Event,
    /// Attempts started so far. Never exceeds `max_attempts`.
    pub attempt: u32,
    pub max_attempts: u32,
    pub state: JobState,
}

/// Why an event was not queued. Rejections are synchronous; nothing
/// reaches the worker.
#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    /// The user has no webhook configured. Not an error in any
    /// meaningful sense; most users have no webhook.
    #[error("no webhook subscription configured")]
    NotConfigured,

    /// The subscription exists but delivery is disabled.
    #[error("webhook subscription is disabled")]
    Disabled,

    /// The queue is at capacity (reject-new overflow policy).
    #[error("webhook delivery queue is full")]
    QueueFull,
}

/// Producer side of the delivery queue.
pub struct WebhookQueue {
    tx: mpsc::Sender<DeliveryJob>,
    subscriptions: Arc<SubscriptionStore>,
}

impl WebhookQueue {
    /// Create a queue bounded at `capacity`, returning the consumer half
    /// for the worker.
    pub fn new(
        capacity: usize,
        subscriptions: Arc<SubscriptionStore>,
    ) -> (Self, mpsc::Receiver<DeliveryJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, subscriptions }, rx)
    }

    /// Queue a delivery job for the event's user.
    ///
    /// Rejected synchronously when the user has no enabled subscription
    /// or the queue is full. URL validity is enforced at configuration
    /// time ([`SubscriptionStore::set_url`]), so an existing subscription
    /// is always https.
    pub async fn enqueue(&self, event: &Event) -> Result<Uuid, EnqueueError> {
        let subscription = self
            .subscriptions
            .get(event.user_id)
            .await
            .ok_or(EnqueueError::NotConfigured)?;
        if !subscription.enabled {
            return Err(EnqueueError::Disabled);
        }

        let job = DeliveryJob {
            id: Uuid::new_v4(),
            user_id: event.user_id,
            event: event.clone(),
            attempt: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            state: JobState::Pending,
        };
        let id = job.id;

        self.tx.try_send(job).map_err(|_| EnqueueError::QueueFull)?;
        tracing::debug!(
            user_id = event.user_id,
            event_type = %event.event_type,
            delivery_id = %id,
            "Webhook delivery queued"
        );
        Ok(id)
    }
}
