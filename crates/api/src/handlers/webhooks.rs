//! Handlers for the `/webhooks` resource: per-user subscription
//! configuration, secret rotation, send-test, and delivery history.
//!
//! The signing secret is write-only through this surface: subscription
//! responses never include it, and `rotate-secret` is the only endpoint
//! that returns a plaintext secret.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use jobpulse_core::error::CoreError;
use jobpulse_events::webhook::DeliveryRecord;
use jobpulse_events::{Event, EventType};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body for `PUT /webhooks`.
#[derive(Debug, Deserialize)]
pub struct SetWebhookRequest {
    pub url: String,
}

/// Body for `PUT /webhooks/enabled`.
#[derive(Debug, Deserialize)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

/// GET /api/v1/webhooks
///
/// Return the authenticated user's webhook subscription (without the
/// signing secret), or 404 if none is configured.
pub async fn get_webhook(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let subscription = state
        .subscriptions
        .get(auth.user_id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "WebhookSubscription",
            id: auth.user_id,
        }))?;

    Ok(Json(DataResponse { data: subscription }))
}

/// PUT /api/v1/webhooks
///
/// Set (or create) the webhook endpoint URL. Only `https://` URLs are
/// accepted. First-time configuration generates a signing secret, which
/// must then be fetched via `POST /webhooks/rotate-secret`.
pub async fn set_webhook(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SetWebhookRequest>,
) -> AppResult<impl IntoResponse> {
    let subscription = state.subscriptions.set_url(auth.user_id, &input.url).await?;
    Ok(Json(DataResponse { data: subscription }))
}

/// DELETE /api/v1/webhooks
///
/// Remove the authenticated user's webhook subscription. Queued
/// deliveries are dropped by the worker's pre-send subscription check.
pub async fn delete_webhook(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let removed = state.subscriptions.remove(auth.user_id).await;

    if !removed {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "WebhookSubscription",
            id: auth.user_id,
        }));
    }

    tracing::info!(user_id = auth.user_id, "Webhook subscription deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/webhooks/enabled
///
/// Enable or disable delivery without touching the URL or secret.
pub async fn set_enabled(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SetEnabledRequest>,
) -> AppResult<impl IntoResponse> {
    let subscription = state
        .subscriptions
        .set_enabled(auth.user_id, input.enabled)
        .await?;

    Ok(Json(DataResponse { data: subscription }))
}

/// POST /api/v1/webhooks/rotate-secret
///
/// Replace the signing secret and return the new plaintext. This is the
/// only endpoint that ever returns a secret; there is no way to read the
/// current one.
pub async fn rotate_secret(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let secret = state.subscriptions.rotate_secret(auth.user_id).await?;

    Ok(Json(serde_json::json!({
        "data": { "secret": secret }
    })))
}

/// GET /api/v1/webhooks/events
///
/// List the dotted names of every subscribable event type.
pub async fn list_event_types() -> Json<serde_json::Value> {
    let names: Vec<&str> = EventType::ALL.iter().map(EventType::as_str).collect();
    Json(serde_json::json!({ "data": names }))
}

/// POST /api/v1/webhooks/test
///
/// Send a `webhook.test` event to the configured endpoint synchronously
/// (no retries) and report the outcome. The attempt is also recorded in
/// the delivery history.
pub async fn test_webhook(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let subscription = state
        .subscriptions
        .get(auth.user_id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "WebhookSubscription",
            id: auth.user_id,
        }))?;

    let event = Event::new(EventType::WebhookTest, auth.user_id).with_payload(
        serde_json::json!({
            "message": "Test delivery to verify webhook connectivity."
        }),
    );
    let delivery_id = Uuid::new_v4();

    let started = std::time::Instant::now();
    let result = state.sender.send(&subscription, &event, delivery_id).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let (success, status_code, error) = match &result {
        Ok(status) => (true, Some(*status), None),
        Err(e) => (false, e.status_code(), Some(e.to_string())),
    };

    state
        .delivery_log
        .record(DeliveryRecord {
            id: delivery_id,
            user_id: auth.user_id,
            event_type: EventType::WebhookTest,
            url: subscription.url.clone(),
            success,
            status_code,
            error: error.clone(),
            retries: 1,
            latency_ms,
            completed_at: chrono::Utc::now(),
        })
        .await;

    tracing::info!(
        user_id = auth.user_id,
        delivery_id = %delivery_id,
        success,
        "Test webhook delivery completed",
    );

    Ok(Json(serde_json::json!({
        "data": {
            "delivery_id": delivery_id,
            "success": success,
            "status_code": status_code,
            "error": error,
        }
    })))
}

/// GET /api/v1/webhooks/deliveries
///
/// A page of the authenticated user's delivery history, newest first.
pub async fn list_deliveries(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let deliveries = state
        .delivery_log
        .list(auth.user_id, params.page(), params.page_size())
        .await;

    Ok(Json(DataResponse { data: deliveries }))
}
