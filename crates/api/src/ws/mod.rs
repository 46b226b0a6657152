//! WebSocket infrastructure: connection registry, upgrade handler, and
//! the heartbeat task that keeps liveness state fresh.

pub mod handler;
pub mod heartbeat;
pub mod registry;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use registry::WsRegistry;
