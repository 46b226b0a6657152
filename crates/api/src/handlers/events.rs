//! Event intake: lets authenticated clients (and integration tests)
//! publish an event for themselves through the full distribution path.
//!
//! Production event producers call [`EventDispatcher::publish`] directly;
//! this endpoint is the HTTP face of the same seam.
//!
//! [`EventDispatcher::publish`]: jobpulse_events::EventDispatcher::publish

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use jobpulse_events::{Event, EventType};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Body for `POST /events`.
#[derive(Debug, Deserialize)]
pub struct PublishEventRequest {
    /// Dotted event name (e.g. `"job.applied"`). Unknown names are
    /// rejected at deserialization time.
    pub event: EventType,
    /// Optional event payload, forwarded verbatim to both channels.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// POST /api/v1/events
///
/// Publish an event targeting the authenticated user. Fire-and-forget:
/// the response only acknowledges acceptance, never delivery outcomes.
pub async fn publish_event(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<PublishEventRequest>,
) -> AppResult<impl IntoResponse> {
    let mut event = Event::new(input.event, auth.user_id);
    if let Some(payload) = input.payload {
        event = event.with_payload(payload);
    }

    state.dispatcher.publish(event).await;
    Ok(StatusCode::ACCEPTED)
}
