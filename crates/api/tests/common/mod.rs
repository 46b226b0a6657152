// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use jobpulse_api::auth::jwt::{generate_access_token, JwtConfig};
use jobpulse_api::config::ServerConfig;
use jobpulse_api::router::build_app_router;
use jobpulse_api::state::AppState;
use jobpulse_api::ws::WsRegistry;
use jobpulse_core::types::DbId;
use jobpulse_events::webhook::{
    DeliveryJob, DeliveryLog, DeliverySender, SubscriptionStore, WebhookQueue,
};
use jobpulse_events::{ConnectionSink, EventDispatcher, NotificationStore, RealtimePublisher};
use tokio::sync::mpsc;

/// A fully-wired application for integration tests.
///
/// `state` gives tests direct access to the stores for seeding, and
/// `webhook_rx` is the consumer half of the delivery queue (no worker
/// runs in tests, so queued jobs can be inspected directly).
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub webhook_rx: mpsc::Receiver<DeliveryJob>,
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        webhook_queue_capacity: 16,
        jwt: JwtConfig {
            secret: "integration-test-secret-long-enough".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Assemble the application exactly as `main.rs` does, minus the worker
/// and heartbeat background tasks.
pub fn build_test_app() -> TestApp {
    let config = test_config();

    let registry = Arc::new(WsRegistry::new());
    let store = Arc::new(NotificationStore::new());
    let subscriptions = Arc::new(SubscriptionStore::new());
    let delivery_log = Arc::new(DeliveryLog::new());
    let sender = Arc::new(DeliverySender::new());

    let realtime = Arc::new(RealtimePublisher::new(
        Arc::clone(&registry) as Arc<dyn ConnectionSink>,
        Arc::clone(&store),
    ));
    let (queue, webhook_rx) =
        WebhookQueue::new(config.webhook_queue_capacity, Arc::clone(&subscriptions));
    let dispatcher = Arc::new(EventDispatcher::new(realtime, Arc::new(queue)));

    let state = AppState {
        config: Arc::new(config.clone()),
        registry,
        store,
        subscriptions,
        delivery_log,
        sender,
        dispatcher,
    };
    let app = build_app_router(state.clone(), &config);

    TestApp {
        app,
        state,
        webhook_rx,
    }
}

/// `Authorization` header value for the given user.
pub fn auth_header(user_id: DbId) -> String {
    let token = generate_access_token(user_id, &test_config().jwt)
        .expect("token generation should succeed");
    format!("Bearer {token}")
}
