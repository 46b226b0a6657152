//! Domain-independent building blocks shared across the workspace.
//!
//! This crate has no internal dependencies so it can be used by the
//! event-distribution crates, the API server, and any future worker or
//! CLI tooling.

pub mod error;
pub mod signature;
pub mod types;
