//! The domain event model.
//!
//! [`Event`] is constructed via [`Event::new`] and enriched with
//! [`with_payload`](Event::with_payload). The event catalogue is closed:
//! producers can only publish the types listed in [`EventType`], which is
//! also what the webhook config surface advertises to subscribers.

use jobpulse_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};

/// The closed set of event types the platform emits.
///
/// Serialized as the dotted wire names (`"job.applied"` etc.) in both
/// the WebSocket frames and the webhook payload/`X-Webhook-Event` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "job.applied")]
    JobApplied,
    #[serde(rename = "resume.analyzed")]
    ResumeAnalyzed,
    #[serde(rename = "profile.updated")]
    ProfileUpdated,
    #[serde(rename = "subscription.changed")]
    SubscriptionChanged,
    #[serde(rename = "credit.low")]
    CreditLow,
    #[serde(rename = "analysis.completed")]
    AnalysisCompleted,
    #[serde(rename = "webhook.test")]
    WebhookTest,
}

impl EventType {
    /// Every event type, in catalogue order. Used by the webhook config
    /// surface to list subscribable event names.
    pub const ALL: [EventType; 7] = [
        EventType::JobApplied,
        EventType::ResumeAnalyzed,
        EventType::ProfileUpdated,
        EventType::SubscriptionChanged,
        EventType::CreditLow,
        EventType::AnalysisCompleted,
        EventType::WebhookTest,
    ];

    /// The dotted wire name of this event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::JobApplied => "job.applied",
            EventType::ResumeAnalyzed => "resume.analyzed",
            EventType::ProfileUpdated => "profile.updated",
            EventType::SubscriptionChanged => "subscription.changed",
            EventType::CreditLow => "credit.low",
            EventType::AnalysisCompleted => "analysis.completed",
            EventType::WebhookTest => "webhook.test",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A domain event targeting a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// What happened.
    pub event_type: EventType,

    /// The user the event concerns (and whose channels it is delivered on).
    pub user_id: DbId,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event occurred (UTC).
    pub occurred_at: Timestamp,
}

impl Event {
    /// Create a new event for a user with an empty payload.
    pub fn new(event_type: EventType, user_id: DbId) -> Self {
        Self {
            event_type,
            user_id,
            payload: serde_json::Value::Object(Default::default()),
            occurred_at: chrono::Utc::now(),
        }
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_serializes_to_dotted_name() {
        let json = serde_json::to_string(&EventType::JobApplied).unwrap();
        assert_eq!(json, "\"job.applied\"");
    }

    #[test]
    fn event_type_round_trips_through_serde() {
        for et in EventType::ALL {
            let json = serde_json::to_string(&et).unwrap();
            let back: EventType = serde_json::from_str(&json).unwrap();
            assert_eq!(back, et);
            assert_eq!(json, format!("\"{}\"", et.as_str()));
        }
    }

    #[test]
    fn unknown_event_name_fails_to_deserialize() {
        let result: Result<EventType, _> = serde_json::from_str("\"job.deleted\"");
        assert!(result.is_err());
    }

    #[test]
    fn new_event_has_empty_payload() {
        let event = Event::new(EventType::CreditLow, 7);
        assert_eq!(event.user_id, 7);
        assert!(event.payload.as_object().unwrap().is_empty());
    }

    #[test]
    fn with_payload_replaces_payload() {
        let event = Event::new(EventType::JobApplied, 1)
            .with_payload(serde_json::json!({"jobId": "42"}));
        assert_eq!(event.payload["jobId"], "42");
    }
}
