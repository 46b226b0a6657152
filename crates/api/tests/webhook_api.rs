//! Integration tests for the `/webhooks` REST surface and the event
//! intake endpoint.
//!
//! No delivery worker runs here; jobs queued by a publish are inspected
//! through the test harness's queue receiver.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use jobpulse_core::signature;
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
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, value)
}

// ---------------------------------------------------------------------------
// Test: no subscription configured yet
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_without_subscription_is_not_found() {
    let harness = build_test_app();
    let auth = auth_header(1);

    let (status, body) = request(&harness.app, "GET", "/api/v1/webhooks", Some(&auth), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Test: non-https URLs are rejected synchronously
// ---------------------------------------------------------------------------

#[tokio::test]
async fn set_url_rejects_plain_http() {
    let harness = build_test_app();
    let auth = auth_header(1);

    let (status, body) = request(
        &harness.app,
        "PUT",
        "/api/v1/webhooks",
        Some(&auth),
        Some(json!({ "url": "http://example.com/hook" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Test: configuring a webhook never exposes the secret
// ---------------------------------------------------------------------------

#[tokio::test]
async fn set_url_creates_subscription_without_leaking_secret() {
    let harness = build_test_app();
    let auth = auth_header(1);

    let (status, body) = request(
        &harness.app,
        "PUT",
        "/api/v1/webhooks",
        Some(&auth),
        Some(json!({ "url": "https://example.com/hook" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["url"], "https://example.com/hook");
    assert_eq!(body["data"]["enabled"], true);
    assert!(
        body["data"].get("secret").is_none(),
        "secret must not appear in subscription responses"
    );

    let (_, body) = request(&harness.app, "GET", "/api/v1/webhooks", Some(&auth), None).await;
    assert!(body["data"].get("secret").is_none());
}

// ---------------------------------------------------------------------------
// Test: rotate-secret is the only way to obtain a signing secret
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rotate_secret_returns_fresh_plaintext() {
    let harness = build_test_app();
    let auth = auth_header(1);
    request(
        &harness.app,
        "PUT",
        "/api/v1/webhooks",
        Some(&auth),
        Some(json!({ "url": "https://example.com/hook" })),
    )
    .await;

    let (status, body) = request(
        &harness.app,
        "POST",
        "/api/v1/webhooks/rotate-secret",
        Some(&auth),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let first = body["data"]["secret"].as_str().unwrap().to_string();
    assert_eq!(first.len(), signature::SECRET_LENGTH);

    let (_, body) = request(
        &harness.app,
        "POST",
        "/api/v1/webhooks/rotate-secret",
        Some(&auth),
        None,
    )
    .await;
    assert_ne!(body["data"]["secret"].as_str().unwrap(), first);
}

// ---------------------------------------------------------------------------
// Test: rotating without a subscription is 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rotate_secret_without_subscription_is_not_found() {
    let harness = build_test_app();
    let auth = auth_header(9);

    let (status, _) = request(
        &harness.app,
        "POST",
        "/api/v1/webhooks/rotate-secret",
        Some(&auth),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: the event catalogue endpoint lists every dotted name
// ---------------------------------------------------------------------------

#[tokio::test]
async fn events_endpoint_lists_catalogue() {
    let harness = build_test_app();
    let auth = auth_header(1);

    let (status, body) = request(
        &harness.app,
        "GET",
        "/api/v1/webhooks/events",
        Some(&auth),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let names = body["data"].as_array().unwrap();
    assert_eq!(names.len(), 7);
    assert!(names.contains(&json!("job.applied")));
    assert!(names.contains(&json!("webhook.test")));
}

// ---------------------------------------------------------------------------
// Test: enable/disable toggling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn enabled_toggle() {
    let harness = build_test_app();
    let auth = auth_header(1);
    request(
        &harness.app,
        "PUT",
        "/api/v1/webhooks",
        Some(&auth),
        Some(json!({ "url": "https://example.com/hook" })),
    )
    .await;

    let (status, body) = request(
        &harness.app,
        "PUT",
        "/api/v1/webhooks/enabled",
        Some(&auth),
        Some(json!({ "enabled": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["enabled"], false);

    // A publish while disabled queues nothing.
    let (status, _) = request(
        &harness.app,
        "POST",
        "/api/v1/events",
        Some(&auth),
        Some(json!({ "event": "job.applied" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let mut webhook_rx = harness.webhook_rx;
    assert!(webhook_rx.try_recv().is_err(), "disabled webhook gets no job");
}

// ---------------------------------------------------------------------------
// Test: delete returns 204, then 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_then_missing() {
    let harness = build_test_app();
    let auth = auth_header(1);
    request(
        &harness.app,
        "PUT",
        "/api/v1/webhooks",
        Some(&auth),
        Some(json!({ "url": "https://example.com/hook" })),
    )
    .await;

    let (status, _) = request(&harness.app, "DELETE", "/api/v1/webhooks", Some(&auth), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = request(&harness.app, "DELETE", "/api/v1/webhooks", Some(&auth), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: delivery history starts empty and paginates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deliveries_start_empty() {
    let harness = build_test_app();
    let auth = auth_header(1);

    let (status, body) = request(
        &harness.app,
        "GET",
        "/api/v1/webhooks/deliveries?page=1&page_size=10",
        Some(&auth),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

// ---------------------------------------------------------------------------
// Test: publishing an event reaches both channels
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publish_event_queues_job_and_stores_notification() {
    let harness = build_test_app();
    let auth = auth_header(1);
    request(
        &harness.app,
        "PUT",
        "/api/v1/webhooks",
        Some(&auth),
        Some(json!({ "url": "https://example.com/hook" })),
    )
    .await;

    let (status, _) = request(
        &harness.app,
        "POST",
        "/api/v1/events",
        Some(&auth),
        Some(json!({ "event": "resume.analyzed", "payload": { "resumeId": "7" } })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let mut webhook_rx = harness.webhook_rx;
    let job = webhook_rx.recv().await.expect("a delivery job was queued");
    assert_eq!(job.user_id, 1);
    assert_eq!(job.event.payload["resumeId"], "7");

    // The realtime push runs on a spawned task; poll the store briefly.
    for _ in 0..100 {
        if harness.state.store.unread_count(1).await == 1 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("notification never reached the offline store");
}

// ---------------------------------------------------------------------------
// Test: unknown event names are rejected
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publish_unknown_event_name_is_rejected() {
    let harness = build_test_app();
    let auth = auth_header(1);

    let (status, _) = request(
        &harness.app,
        "POST",
        "/api/v1/events",
        Some(&auth),
        Some(json!({ "event": "job.deleted" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
