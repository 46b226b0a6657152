//! Webhook delivery channel.
//!
//! Delivery is at-least-once: a job is attempted up to
//! [`queue::DEFAULT_MAX_ATTEMPTS`] times with a fixed backoff schedule,
//! and receivers deduplicate on the `X-Webhook-Delivery` id. Terminal
//! outcomes (success or exhausted retries) land in the [`log::DeliveryLog`].

pub mod log;
pub mod queue;
pub mod sender;
pub mod subscription;
pub mod worker;

pub use log::{DeliveryLog, DeliveryRecord};
pub use queue::{DeliveryJob, EnqueueError, JobState, WebhookQueue};
pub use sender::{DeliveryError, DeliverySender};
pub use subscription::{SubscriptionStore, WebhookSubscription};
pub use worker::{DeliveryWorker, WorkerConfig};
