//! Data Sessions - A user-scoped session cache server
//!
//! Stores computed session payloads in per-user namespaces, refreshes their
//! access time asynchronously on read and evicts namespaces left idle.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_sweep_task;
