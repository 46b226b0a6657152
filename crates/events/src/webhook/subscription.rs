//! Per-user webhook subscription configuration.
//!
//! Owned by the user and mutated only through the explicit operations
//! here; the delivery worker re-reads the current subscription before
//! every attempt, so disable/rotate take effect immediately.

use std::collections::HashMap;

use jobpulse_core::error::CoreError;
use jobpulse_core::signature;
use jobpulse_core::types::{DbId, Timestamp};
use serde::Serialize;
use tokio::sync::RwLock;

/// A user's webhook endpoint configuration.
///
/// The secret never leaves the server except at creation/rotation time;
/// serialization skips it so it cannot leak through list/get responses.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookSubscription {
    pub user_id: DbId,
    pub url: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub enabled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// In-memory subscription registry, one subscription per user.
#[derive(Default)]
pub struct SubscriptionStore {
    inner: RwLock<HashMap<DbId, WebhookSubscription>>,
}

impl SubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: DbId) -> Option<WebhookSubscription> {
        self.inner.read().await.get(&user_id).cloned()
    }

    /// Set (or create) the user's webhook URL.
    ///
    /// Only `https://` URLs are accepted; anything else is rejected
    /// synchronously and never reaches the queue. First-time
    /// configuration generates a signing secret and enables delivery.
    pub async fn set_url(&self, user_id: DbId, url: &str) -> Result<WebhookSubscription, CoreError> {
        let url = url.trim();
        validate_url(url)?;

        let now = chrono::Utc::now();
        let mut inner = self.inner.write().await;
        let sub = inner
            .entry(user_id)
            .and_modify(|s| {
                s.url = url.to_string();
                s.updated_at = now;
            })
            .or_insert_with(|| WebhookSubscription {
                user_id,
                url: url.to_string(),
                secret: signature::generate_secret(),
                enabled: true,
                created_at: now,
                updated_at: now,
            });

        tracing::info!(user_id, url = %sub.url, "Webhook URL configured");
        Ok(sub.clone())
    }

    /// Enable or disable delivery. Disabling stops new enqueues at once;
    /// already-queued jobs are dropped by the worker's pre-send re-check.
    pub async fn set_enabled(
        &self,
        user_id: DbId,
        enabled: bool,
    ) -> Result<WebhookSubscription, CoreError> {
        let mut inner = self.inner.write().await;
        let sub = inner.get_mut(&user_id).ok_or(CoreError::NotFound {
            entity: "WebhookSubscription",
            id: user_id,
        })?;
        sub.enabled = enabled;
        sub.updated_at = chrono::Utc::now();

        tracing::info!(user_id, enabled, "Webhook delivery toggled");
        Ok(sub.clone())
    }

    /// Replace the signing secret, returning the new plaintext.
    ///
    /// The swap is atomic under the write lock: there is no grace period
    /// during which signatures made with the old secret still verify.
    pub async fn rotate_secret(&self, user_id: DbId) -> Result<String, CoreError> {
        let mut inner = self.inner.write().await;
        let sub = inner.get_mut(&user_id).ok_or(CoreError::NotFound {
            entity: "WebhookSubscription",
            id: user_id,
        })?;
        let secret = signature::generate_secret();
        sub.secret = secret.clone();
        sub.updated_at = chrono::Utc::now();

        tracing::info!(user_id, "Webhook secret rotated");
        Ok(secret)
    }

    /// Delete the user's subscription. Returns whether one existed.
    pub async fn remove(&self, user_id: DbId) -> bool {
        self.inner.write().await.remove(&user_id).is_some()
    }

    /// Insert a subscription as-is, skipping URL validation. Lets worker
    /// tests point at plain-http listeners on localhost.
    #[cfg(test)]
    pub(crate) async fn insert_for_tests(&self, subscription: WebhookSubscription) {
        self.inner
            .write()
            .await
            .insert(subscription.user_id, subscription);
    }
}

fn validate_url(url: &str) -> Result<(), CoreError> {
    if url.is_empty() {
        return Err(CoreError::Validation("webhook URL must not be empty".into()));
    }
    let rest = url.strip_prefix("https://").ok_or_else(|| {
        CoreError::Validation("webhook URL must use https://".into())
    })?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err(CoreError::Validation("webhook URL has no host".into()));
    }
    Ok(())
}
