use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobpulse_api::config::ServerConfig;
use jobpulse_api::router::build_app_router;
use jobpulse_api::state::AppState;
use jobpulse_api::ws;
use jobpulse_events::webhook::{
    DeliveryLog, DeliverySender, DeliveryWorker, SubscriptionStore, WebhookQueue, WorkerConfig,
};
use jobpulse_events::{EventDispatcher, NotificationStore, RealtimePublisher};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobpulse_api=debug,jobpulse_events=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- WebSocket registry + heartbeat ---
    let registry = Arc::new(ws::WsRegistry::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&registry));

    // --- Stores ---
    let store = Arc::new(NotificationStore::new());
    let subscriptions = Arc::new(SubscriptionStore::new());
    let delivery_log = Arc::new(DeliveryLog::new());

    // --- Event distribution ---
    let realtime = Arc::new(RealtimePublisher::new(
        Arc::clone(&registry) as Arc<dyn jobpulse_events::ConnectionSink>,
        Arc::clone(&store),
    ));
    let (queue, queue_rx) =
        WebhookQueue::new(config.webhook_queue_capacity, Arc::clone(&subscriptions));
    let dispatcher = Arc::new(EventDispatcher::new(realtime, Arc::new(queue)));

    // --- Webhook delivery worker ---
    let sender = Arc::new(DeliverySender::new());
    let worker = DeliveryWorker::new(
        queue_rx,
        Arc::clone(&sender),
        Arc::clone(&subscriptions),
        Arc::clone(&delivery_log),
        WorkerConfig::default(),
    );
    let worker_cancel = tokio_util::sync::CancellationToken::new();
    let worker_handle = tokio::spawn(worker.run(worker_cancel.clone()));
    tracing::info!("Webhook delivery worker started");

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        registry: Arc::clone(&registry),
        store,
        subscriptions,
        delivery_log,
        sender,
        dispatcher,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stop the delivery worker; in-flight retries are abandoned after the
    // grace period.
    worker_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), worker_handle).await;
    tracing::info!("Webhook delivery worker stopped");

    let ws_count = registry.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    registry.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Heartbeat task stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
