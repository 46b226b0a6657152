//! Webhook delivery worker: the retry state machine.
//!
//! A single logical consumer drains the queue FIFO. Failed attempts are
//! parked in a [`DelayQueue`] (time-ordered, no per-retry OS timer) and
//! re-enter the loop when their delay fires, so waiting retries never
//! stall fresh enqueues. A given job is owned by exactly one place at a
//! time (the channel, the delay queue, or the in-flight attempt), so it
//! can never be in flight twice.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::time::DelayQueue;

use crate::webhook::log::{DeliveryLog, DeliveryRecord};
use crate::webhook::queue::{DeliveryJob, JobState};
use crate::webhook::sender::DeliverySender;
use crate::webhook::subscription::SubscriptionStore;

/// Fixed per-attempt retry delays.
///
/// Indexed by completed attempts: after attempt 1 fails the job waits
/// `RETRY_DELAYS[0]` (1 s) before attempt 2, after attempt 2 it waits
/// `RETRY_DELAYS[1]` (5 s), and so on. Attempts beyond the table reuse
/// the last entry.
pub const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(5),
    Duration::from_secs(15),
];

/// Tuning knobs for the worker. Tests shrink the delays to milliseconds.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub retry_delays: Vec<Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            retry_delays: RETRY_DELAYS.to_vec(),
        }
    }
}

impl WorkerConfig {
    /// Delay before the next attempt, given how many attempts have
    /// completed so far.
    fn delay_after(&self, completed_attempts: u32) -> Duration {
        let idx = (completed_attempts.saturating_sub(1) as usize)
            .min(self.retry_delays.len().saturating_sub(1));
        self.retry_delays
            .get(idx)
            .copied()
            .unwrap_or(Duration::from_secs(1))
    }
}

/// Single consumer of the webhook delivery queue.
pub struct DeliveryWorker {
    rx: mpsc::Receiver<DeliveryJob>,
    retries: DelayQueue<DeliveryJob>,
    sender: Arc<DeliverySender>,
    subscriptions: Arc<SubscriptionStore>,
    log: Arc<DeliveryLog>,
    config: WorkerConfig,
}

impl DeliveryWorker {
    pub fn new(
        rx: mpsc::Receiver<DeliveryJob>,
        sender: Arc<DeliverySender>,
        subscriptions: Arc<SubscriptionStore>,
        log: Arc<DeliveryLog>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            rx,
            retries: DelayQueue::new(),
            sender,
            subscriptions,
            log,
            config,
        }
    }

    /// Run until cancelled, or until the queue closes and all scheduled
    /// retries have drained.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut queue_open = true;
        loop {
            if !queue_open && self.retries.is_empty() {
                break;
            }
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Webhook worker shutting down");
                    break;
                }
                maybe_job = self.rx.recv(), if queue_open => match maybe_job {
                    Some(job) => self.attempt(job).await,
                    None => queue_open = false,
                },
                Some(expired) = self.retries.next(), if !self.retries.is_empty() => {
                    let mut job = expired.into_inner();
                    job.state = JobState::Pending;
                    self.attempt(job).await;
                }
            }
        }
    }

    /// Execute one delivery attempt and advance the job's state machine.
    async fn attempt(&mut self, mut job: DeliveryJob) {
        // The subscription is re-read on every attempt so a disable or
        // removal between enqueue and send takes effect immediately.
        let Some(subscription) = self.subscriptions.get(job.user_id).await else {
            tracing::info!(
                delivery_id = %job.id,
                user_id = job.user_id,
                "Subscription removed since enqueue; dropping delivery"
            );
            return;
        };
        if !subscription.enabled {
            tracing::info!(
                delivery_id = %job.id,
                user_id = job.user_id,
                "Subscription disabled since enqueue; dropping delivery"
            );
            return;
        }

        debug_assert!(job.attempt < job.max_attempts);
        job.state = JobState::InFlight;
        job.attempt += 1;

        let started = std::time::Instant::now();
        let result = self.sender.send(&subscription, &job.event, job.id).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(status) => {
                job.state = JobState::Succeeded;
                tracing::info!(
                    delivery_id = %job.id,
                    user_id = job.user_id,
                    event_type = %job.event.event_type,
                    status,
                    attempt = job.attempt,
                    latency_ms,
                    "Webhook delivered"
                );
                self.log
                    .record(DeliveryRecord {
                        id: job.id,
                        user_id: job.user_id,
                        event_type: job.event.event_type,
                        url: subscription.url,
                        success: true,
                        status_code: Some(status),
                        error: None,
                        retries: job.attempt,
                        latency_ms,
                        completed_at: chrono::Utc::now(),
                    })
                    .await;
            }
            Err(e) if job.attempt < job.max_attempts => {
                job.state = JobState::RetryScheduled;
                let delay = self.config.delay_after(job.attempt);
                tracing::warn!(
                    delivery_id = %job.id,
                    user_id = job.user_id,
                    attempt = job.attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "Webhook delivery attempt failed, retry scheduled"
                );
                self.retries.insert(job, delay);
            }
            Err(e) => {
                job.state = JobState::FailedTerminal;
                tracing::error!(
                    delivery_id = %job.id,
                    user_id = job.user_id,
                    event_type = %job.event.event_type,
                    retries = job.attempt,
                    error = %e,
                    "Webhook delivery failed after all retries"
                );
                self.log
                    .record(DeliveryRecord {
                        id: job.id,
                        user_id: job.user_id,
                        event_type: job.event.event_type,
                        url: subscription.url,
                        success: false,
                        status_code: e.status_code(),
                        error: Some(e.to_string()),
                        retries: job.attempt,
                        latency_ms,
                        completed_at: chrono::Utc::now(),
                    })
                    .await;
            }
        }
    }
}
