//! Offline notification store.
//!
//! Per-user bounded, TTL-expiring notification log. The real-time channel
//! is best-effort, so every notification is written here first; clients
//! that were offline catch up from this store on their next connect.
//!
//! The store is in-memory by design: durability across process restarts
//! is an explicit non-goal of the reference design.

use std::collections::{HashMap, VecDeque};

use jobpulse_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::event::Event;

/// Maximum notifications retained per user; the oldest entry is evicted
/// FIFO when a new one would exceed this.
pub const MAX_PER_USER: usize = 50;

/// Days until a stored notification expires.
pub const TTL_DAYS: i64 = 30;

/// A stored in-app notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: DbId,
    pub title: String,
    pub message: String,
    /// Coarse grouping for client-side filtering (e.g. `"jobs"`, `"billing"`).
    pub category: String,
    /// `"normal"` or `"high"`.
    pub priority: String,
    pub read: bool,
    pub created_at: Timestamp,
    /// Entries past this instant are excluded from reads even before they
    /// are physically purged.
    pub expires_at: Timestamp,
    /// Event payload carried through for the client.
    pub data: serde_json::Value,
}

impl Notification {
    /// Build a notification from a domain event, assigning a fresh id and
    /// the standard TTL. Title/message/category are derived per event type.
    pub fn from_event(event: &Event) -> Self {
        let (title, message, category, priority) = describe(event);
        let now = chrono::Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: event.user_id,
            title,
            message,
            category,
            priority,
            read: false,
            created_at: now,
            expires_at: now + chrono::Duration::days(TTL_DAYS),
            data: event.payload.clone(),
        }
    }

    fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

/// Human-readable copy for each event type.
fn describe(event: &Event) -> (String, String, String, String) {
    use crate::event::EventType::*;
    let (title, message, category, priority) = match event.event_type {
        JobApplied => (
            "Application sent",
            "Your job application was submitted.",
            "jobs",
            "normal",
        ),
        ResumeAnalyzed => (
            "Resume analyzed",
            "Your resume analysis is ready.",
            "analysis",
            "normal",
        ),
        ProfileUpdated => (
            "Profile updated",
            "Your profile changes were saved.",
            "account",
            "normal",
        ),
        SubscriptionChanged => (
            "Subscription changed",
            "Your subscription plan was updated.",
            "billing",
            "high",
        ),
        CreditLow => (
            "Credits running low",
            "You are almost out of analysis credits.",
            "billing",
            "high",
        ),
        AnalysisCompleted => (
            "Analysis completed",
            "A background analysis has finished.",
            "analysis",
            "normal",
        ),
        WebhookTest => (
            "Webhook test",
            "A test event was generated for your webhook.",
            "system",
            "normal",
        ),
    };
    (
        title.to_string(),
        message.to_string(),
        category.to_string(),
        priority.to_string(),
    )
}

/// Per-user notification preferences (REST `preferences` surface).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreferences {
    /// When `false`, notifications are stored but not pushed live.
    pub realtime_enabled: bool,
    /// Categories the user has muted entirely (not stored, not pushed).
    pub muted_categories: Vec<String>,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            realtime_enabled: true,
            muted_categories: Vec::new(),
        }
    }
}

#[derive(Default)]
struct UserEntry {
    items: VecDeque<Notification>,
    preferences: NotificationPreferences,
}

/// Thread-safe per-user notification log.
///
/// All mutations go through the single write lock, which serializes
/// concurrent `add`/`mark_read` for the same user (read-modify-write
/// safety). Designed to be wrapped in `Arc` and shared.
#[derive(Default)]
pub struct NotificationStore {
    users: RwLock<HashMap<DbId, UserEntry>>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a notification for its user, evicting the oldest entry if
    /// the user is at capacity. Expired entries are physically purged on
    /// the way in so they never count against the cap.
    pub async fn add(&self, notification: Notification) {
        let now = chrono::Utc::now();
        let mut users = self.users.write().await;
        let entry = users.entry(notification.user_id).or_default();

        entry.items.retain(|n| !n.is_expired(now));
        while entry.items.len() >= MAX_PER_USER {
            entry.items.pop_front();
        }
        entry.items.push_back(notification);
    }

    /// Mark the given notification ids as read. An empty id slice means
    /// "mark all". Already-read, unknown, and expired ids are skipped, so
    /// applying the same set twice is a no-op and the returned count never
    /// exceeds what `unread_count` reported. Returns how many entries were
    /// newly marked.
    pub async fn mark_read(&self, user_id: DbId, ids: &[Uuid]) -> usize {
        let now = chrono::Utc::now();
        let mut users = self.users.write().await;
        let Some(entry) = users.get_mut(&user_id) else {
            return 0;
        };

        let mut marked = 0;
        for n in entry.items.iter_mut() {
            if !n.read && !n.is_expired(now) && (ids.is_empty() || ids.contains(&n.id)) {
                n.read = true;
                marked += 1;
            }
        }
        marked
    }

    /// List a page of the user's notifications, newest first. Expired
    /// entries are excluded even if not yet purged. `page` is 1-based.
    pub async fn list(
        &self,
        user_id: DbId,
        page: usize,
        page_size: usize,
        unread_only: bool,
    ) -> Vec<Notification> {
        let now = chrono::Utc::now();
        let users = self.users.read().await;
        let Some(entry) = users.get(&user_id) else {
            return Vec::new();
        };

        entry
            .items
            .iter()
            .rev() // newest first
            .filter(|n| !n.is_expired(now))
            .filter(|n| !unread_only || !n.read)
            .skip(page.saturating_sub(1).saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect()
    }

    /// All non-expired unread notifications, newest first. Used for the
    /// `pending_notifications` replay batch on WebSocket connect.
    pub async fn unread(&self, user_id: DbId) -> Vec<Notification> {
        let now = chrono::Utc::now();
        let users = self.users.read().await;
        let Some(entry) = users.get(&user_id) else {
            return Vec::new();
        };
        entry
            .items
            .iter()
            .rev()
            .filter(|n| !n.is_expired(now) && !n.read)
            .cloned()
            .collect()
    }

    /// Count of non-expired unread notifications.
    pub async fn unread_count(&self, user_id: DbId) -> usize {
        let now = chrono::Utc::now();
        let users = self.users.read().await;
        users
            .get(&user_id)
            .map(|e| {
                e.items
                    .iter()
                    .filter(|n| !n.is_expired(now) && !n.read)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Delete a single notification. Returns whether it existed.
    pub async fn delete(&self, user_id: DbId, id: Uuid) -> bool {
        let mut users = self.users.write().await;
        let Some(entry) = users.get_mut(&user_id) else {
            return false;
        };
        let before = entry.items.len();
        entry.items.retain(|n| n.id != id);
        entry.items.len() < before
    }

    pub async fn preferences(&self, user_id: DbId) -> NotificationPreferences {
        let users = self.users.read().await;
        users
            .get(&user_id)
            .map(|e| e.preferences.clone())
            .unwrap_or_default()
    }

    pub async fn set_preferences(&self, user_id: DbId, preferences: NotificationPreferences) {
        let mut users = self.users.write().await;
        users.entry(user_id).or_default().preferences = preferences;
    }
}
