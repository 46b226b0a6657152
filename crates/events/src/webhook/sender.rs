//! Signing HTTP sender for webhook payloads.
//!
//! One [`DeliverySender`] is shared by the retrying worker and the
//! synchronous send-test path. The wire body is serialized to bytes
//! exactly once; the signature covers those bytes and the same buffer is
//! sent as the request body, so no re-serialization can reorder keys
//! between signing and sending.

use std::time::Duration;

use jobpulse_core::signature;
use uuid::Uuid;

use crate::event::Event;
use crate::webhook::subscription::WebhookSubscription;

/// HTTP request timeout for a single delivery attempt.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Signature header carrying `sha256=<hex>`.
pub const HEADER_SIGNATURE: &str = "X-Webhook-Signature";
/// Header carrying the dotted event name.
pub const HEADER_EVENT: &str = "X-Webhook-Event";
/// Header carrying the unique delivery id receivers deduplicate on.
pub const HEADER_DELIVERY: &str = "X-Webhook-Delivery";

/// Error type for a single webhook delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),

    /// The event payload could not be serialized.
    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl DeliveryError {
    /// The HTTP status the receiver answered with, if it answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DeliveryError::HttpStatus(code) => Some(*code),
            DeliveryError::Request(e) => e.status().map(|s| s.as_u16()),
            DeliveryError::Serialize(_) => None,
        }
    }
}

/// Serialize the wire body for an event: `{event, timestamp, userId, data}`.
///
/// These exact bytes are both signed and transmitted.
pub fn wire_body(event: &Event) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&serde_json::json!({
        "event": event.event_type,
        "timestamp": event.occurred_at,
        "userId": event.user_id,
        "data": event.payload,
    }))
}

/// Delivers signed event payloads to subscription endpoints.
pub struct DeliverySender {
    client: reqwest::Client,
}

impl DeliverySender {
    /// Create a sender with a pre-configured HTTP client.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client }
    }

    /// Execute a single signed POST and check the response status.
    ///
    /// Returns the 2xx status code on success. Non-2xx responses,
    /// timeouts, and network failures are all errors; retry policy is the
    /// caller's concern.
    pub async fn send(
        &self,
        subscription: &WebhookSubscription,
        event: &Event,
        delivery_id: Uuid,
    ) -> Result<u16, DeliveryError> {
        let body = wire_body(event)?;
        let sig = signature::signature_header(&body, &subscription.secret);

        let response = self
            .client
            .post(&subscription.url)
            .header("Content-Type", "application/json")
            .header(HEADER_SIGNATURE, sig)
            .header(HEADER_EVENT, event.event_type.as_str())
            .header(HEADER_DELIVERY, delivery_id.to_string())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::HttpStatus(status.as_u16()));
        }
        Ok(status.as_u16())
    }
}

impl Default for DeliverySender {
    fn default() -> Self {
        Self::new()
    }
}
