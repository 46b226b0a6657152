//! Handlers for the `/notifications` resource.
//!
//! All endpoints require authentication via [`AuthUser`]; every operation
//! is implicitly scoped to the authenticated user's own notifications.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use jobpulse_events::store::NotificationPreferences;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /notifications`.
///
/// Pagination fields are spelled out rather than flattened from
/// [`PaginationParams`]: `serde_urlencoded` cannot deserialize numeric
/// fields through `#[serde(flatten)]`.
#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    /// If `true`, return only unread notifications. Defaults to `false`.
    pub unread_only: Option<bool>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl NotificationQuery {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Body for `POST /notifications/read`.
#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    /// Notification ids to mark; an empty (or omitted) list marks all.
    #[serde(default)]
    pub ids: Vec<Uuid>,
}

/// GET /api/v1/notifications
///
/// List the authenticated user's notifications, newest first.
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<impl IntoResponse> {
    let unread_only = params.unread_only.unwrap_or(false);
    let pagination = params.pagination();
    let notifications = state
        .store
        .list(
            auth.user_id,
            pagination.page(),
            pagination.page_size(),
            unread_only,
        )
        .await;

    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// GET /api/v1/notifications/unread-count
///
/// Return the number of unread notifications for the authenticated user.
pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let count = state.store.unread_count(auth.user_id).await;

    Ok(Json(serde_json::json!({
        "data": { "count": count }
    })))
}

/// POST /api/v1/notifications/read
///
/// Mark the given notifications as read (all of them when `ids` is empty).
/// Idempotent: already-read and unknown ids are skipped. Returns how many
/// were newly marked.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<MarkReadRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let marked = state.store.mark_read(auth.user_id, &input.ids).await;

    Ok(Json(serde_json::json!({
        "data": { "marked_read": marked }
    })))
}

/// DELETE /api/v1/notifications/{id}
///
/// Delete a single notification. Returns 204 No Content on success, or
/// 404 if no such notification exists for the authenticated user.
pub async fn delete_notification(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let deleted = state.store.delete(auth.user_id, notification_id).await;

    if !deleted {
        return Err(AppError::NotFound(format!(
            "Notification {notification_id} not found"
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/notifications/preferences
///
/// Return the authenticated user's notification preferences.
pub async fn get_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let prefs = state.store.preferences(auth.user_id).await;
    Ok(Json(DataResponse { data: prefs }))
}

/// PUT /api/v1/notifications/preferences
///
/// Replace the authenticated user's notification preferences.
pub async fn update_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<NotificationPreferences>,
) -> AppResult<impl IntoResponse> {
    state.store.set_preferences(auth.user_id, input.clone()).await;

    tracing::info!(
        user_id = auth.user_id,
        realtime_enabled = input.realtime_enabled,
        "Notification preferences updated",
    );

    Ok(Json(DataResponse { data: input }))
}
