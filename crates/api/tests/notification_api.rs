//! Integration tests for the `/notifications` REST surface.
//!
//! Requests go through the full middleware stack via `tower::ServiceExt`;
//! the store is seeded directly through the shared `AppState`.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use jobpulse_core::types::DbId;
use jobpulse_events::{Event, EventType, Notification};
use serde_json::json;
use tower::ServiceExt;

use common::{auth_header, build_test_app};

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn seed(state: &jobpulse_api::state::AppState, user_id: DbId, event_type: EventType) {
    state
        .store
        .add(Notification::from_event(&Event::new(event_type, user_id)))
        .await;
}

// ---------------------------------------------------------------------------
// Test: health check answers without authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_ok() {
    let harness = build_test_app();

    let (status, body) = request(&harness.app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// ---------------------------------------------------------------------------
// Test: notification endpoints reject unauthenticated requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn endpoints_require_auth() {
    let harness = build_test_app();

    let (status, body) = request(&harness.app, "GET", "/api/v1/notifications", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

// ---------------------------------------------------------------------------
// Test: listing starts empty
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_is_empty_initially() {
    let harness = build_test_app();
    let auth = auth_header(1);

    let (status, body) = request(
        &harness.app,
        "GET",
        "/api/v1/notifications",
        Some(&auth),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

// ---------------------------------------------------------------------------
// Test: listing returns seeded notifications, newest first, per user
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_returns_seeded_newest_first() {
    let harness = build_test_app();
    seed(&harness.state, 1, EventType::JobApplied).await;
    seed(&harness.state, 1, EventType::CreditLow).await;
    seed(&harness.state, 2, EventType::ProfileUpdated).await;
    let auth = auth_header(1);

    let (status, body) = request(
        &harness.app,
        "GET",
        "/api/v1/notifications",
        Some(&auth),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2, "user 2's notification is not visible");
    assert_eq!(data[0]["title"], "Credits running low");
    assert_eq!(data[1]["title"], "Application sent");
}

// ---------------------------------------------------------------------------
// Test: pagination slices the listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pagination_slices_listing() {
    let harness = build_test_app();
    for _ in 0..3 {
        seed(&harness.state, 1, EventType::JobApplied).await;
    }
    let auth = auth_header(1);

    let (status, body) = request(
        &harness.app,
        "GET",
        "/api/v1/notifications?page=2&page_size=2",
        Some(&auth),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: unread-count and the unread_only filter
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unread_count_and_filter() {
    let harness = build_test_app();
    seed(&harness.state, 1, EventType::JobApplied).await;
    seed(&harness.state, 1, EventType::CreditLow).await;
    let auth = auth_header(1);

    let (_, body) = request(
        &harness.app,
        "GET",
        "/api/v1/notifications/unread-count",
        Some(&auth),
        None,
    )
    .await;
    assert_eq!(body["data"]["count"], 2);

    // Mark everything read, then the filtered listing is empty.
    let (status, body) = request(
        &harness.app,
        "POST",
        "/api/v1/notifications/read",
        Some(&auth),
        Some(json!({ "ids": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["marked_read"], 2);

    let (_, body) = request(
        &harness.app,
        "GET",
        "/api/v1/notifications?unread_only=true",
        Some(&auth),
        None,
    )
    .await;
    assert_eq!(body["data"], json!([]));
}

// ---------------------------------------------------------------------------
// Test: marking specific ids is idempotent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mark_read_specific_ids_is_idempotent() {
    let harness = build_test_app();
    seed(&harness.state, 1, EventType::JobApplied).await;
    seed(&harness.state, 1, EventType::CreditLow).await;
    let auth = auth_header(1);

    let (_, body) = request(
        &harness.app,
        "GET",
        "/api/v1/notifications",
        Some(&auth),
        None,
    )
    .await;
    let first_id = body["data"][0]["id"].clone();

    let mark = json!({ "ids": [first_id] });
    let (_, body) = request(
        &harness.app,
        "POST",
        "/api/v1/notifications/read",
        Some(&auth),
        Some(mark.clone()),
    )
    .await;
    assert_eq!(body["data"]["marked_read"], 1);

    // Same set again: nothing new to mark.
    let (_, body) = request(
        &harness.app,
        "POST",
        "/api/v1/notifications/read",
        Some(&auth),
        Some(mark),
    )
    .await;
    assert_eq!(body["data"]["marked_read"], 0);
}

// ---------------------------------------------------------------------------
// Test: delete returns 204, then 404 for the same id
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_then_missing() {
    let harness = build_test_app();
    seed(&harness.state, 1, EventType::JobApplied).await;
    let auth = auth_header(1);

    let (_, body) = request(
        &harness.app,
        "GET",
        "/api/v1/notifications",
        Some(&auth),
        None,
    )
    .await;
    let id = body["data"][0]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/notifications/{id}");

    let (status, _) = request(&harness.app, "DELETE", &uri, Some(&auth), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = request(&harness.app, "DELETE", &uri, Some(&auth), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Test: another user cannot delete someone else's notification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_is_scoped_to_owner() {
    let harness = build_test_app();
    seed(&harness.state, 1, EventType::JobApplied).await;
    let owner = auth_header(1);
    let intruder = auth_header(2);

    let (_, body) = request(
        &harness.app,
        "GET",
        "/api/v1/notifications",
        Some(&owner),
        None,
    )
    .await;
    let id = body["data"][0]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/notifications/{id}");

    let (status, _) = request(&harness.app, "DELETE", &uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Still there for the owner.
    let (_, body) = request(
        &harness.app,
        "GET",
        "/api/v1/notifications",
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: preferences default and round-trip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn preferences_roundtrip() {
    let harness = build_test_app();
    let auth = auth_header(1);

    let (status, body) = request(
        &harness.app,
        "GET",
        "/api/v1/notifications/preferences",
        Some(&auth),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["realtime_enabled"], true);
    assert_eq!(body["data"]["muted_categories"], json!([]));

    let update = json!({ "realtime_enabled": false, "muted_categories": ["billing"] });
    let (status, body) = request(
        &harness.app,
        "PUT",
        "/api/v1/notifications/preferences",
        Some(&auth),
        Some(update),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["realtime_enabled"], false);

    let (_, body) = request(
        &harness.app,
        "GET",
        "/api/v1/notifications/preferences",
        Some(&auth),
        None,
    )
    .await;
    assert_eq!(body["data"]["muted_categories"], json!(["billing"]));
}
