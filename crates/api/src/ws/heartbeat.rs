use std::sync::Arc;
use std::time::Duration;

use crate::ws::registry::WsRegistry;

/// Interval between heartbeat pings (in seconds).
const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// A connection is considered dead if no Pong arrives within this window.
const STALE_AFTER_SECS: u64 = 60;

/// Spawn a background task that pings all connected WebSocket clients and
/// evicts connections that stopped answering.
///
/// The returned `JoinHandle` is aborted during shutdown.
pub fn start_heartbeat(registry: Arc<WsRegistry>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));

        loop {
            interval.tick().await;
            let count = registry.connection_count().await;
            tracing::debug!(count, "WebSocket heartbeat ping");
            registry.ping_all().await;

            let evicted = registry
                .evict_stale(Duration::from_secs(STALE_AFTER_SECS))
                .await;
            if evicted > 0 {
                tracing::info!(evicted, "Evicted unresponsive WebSocket connections");
            }
        }
    })
}
