//! Delivery log: one record per terminal delivery outcome.
//!
//! The production delivery path never reports failures to the publisher;
//! this log is the only place terminal failures become visible, queryable
//! by the subscription owner.

use std::collections::{HashMap, VecDeque};

use jobpulse_core::types::{DbId, Timestamp};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::event::EventType;

/// Records retained per user; older ones roll off.
pub const MAX_RECORDS_PER_USER: usize = 200;

/// Terminal outcome of one delivery job (or one synchronous test send).
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryRecord {
    /// The `X-Webhook-Delivery` id.
    pub id: Uuid,
    pub user_id: DbId,
    pub event_type: EventType,
    pub url: String,
    pub success: bool,
    /// HTTP status of the final attempt, if the receiver answered.
    pub status_code: Option<u16>,
    /// Final error text for failures.
    pub error: Option<String>,
    /// Total attempts made.
    pub retries: u32,
    /// Wall-clock duration of the final attempt.
    pub latency_ms: u64,
    pub completed_at: Timestamp,
}

/// In-memory per-user delivery history.
#[derive(Default)]
pub struct DeliveryLog {
    users: RwLock<HashMap<DbId, VecDeque<DeliveryRecord>>>,
}

impl DeliveryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a terminal record, rolling off the oldest at capacity.
    pub async fn record(&self, record: DeliveryRecord) {
        let mut users = self.users.write().await;
        let entries = users.entry(record.user_id).or_default();
        if entries.len() >= MAX_RECORDS_PER_USER {
            entries.pop_front();
        }
        entries.push_back(record);
    }

    /// A page of the user's delivery history, newest first. `page` is 1-based.
    pub async fn list(&self, user_id: DbId, page: usize, page_size: usize) -> Vec<DeliveryRecord> {
        let users = self.users.read().await;
        let Some(entries) = users.get(&user_id) else {
            return Vec::new();
        };
        entries
            .iter()
            .rev()
            .skip(page.saturating_sub(1).saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect()
    }

    /// Total records currently held for a user.
    pub async fn count(&self, user_id: DbId) -> usize {
        self.users
            .read()
            .await
            .get(&user_id)
            .map(VecDeque::len)
            .unwrap_or(0)
    }
}
