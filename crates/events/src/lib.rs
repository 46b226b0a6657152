//! Event distribution engine.
//!
//! Takes domain events ("job applied", "resume analyzed", ...) and fans
//! them out to two consumers with different reliability contracts:
//!
//! - a best-effort real-time channel over live WebSocket connections,
//!   with store-and-forward for offline users ([`store`], [`realtime`]);
//! - a user-configured webhook URL with HMAC signing, bounded retries
//!   and backoff ([`webhook`]).
//!
//! [`EventDispatcher`] is the single entry point; producers call
//! [`EventDispatcher::publish`] and never observe downstream failures.

pub mod dispatcher;
pub mod event;
pub mod realtime;
pub mod store;
pub mod webhook;

pub use dispatcher::EventDispatcher;
pub use event::{Event, EventType};
pub use realtime::{ConnectionSink, RealtimePublisher};
pub use store::{Notification, NotificationStore};
