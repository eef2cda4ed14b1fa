//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{DEFAULT_NAMESPACE_PREFIX, MAX_PAYLOAD_SIZE};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Prefix of per-user namespace names
    pub namespace_prefix: String,
    /// Seconds between idle sweeps
    pub sweep_interval: u64,
    /// Seconds a namespace may go unused before eviction
    pub idle_threshold: u64,
    /// Destroy evicted namespaces instead of only clearing them
    pub drop_idle_namespaces: bool,
    /// Worker pool size
    pub worker_count: usize,
    /// Maximum jobs waiting for a worker
    pub worker_backlog: usize,
    /// Maximum serialized payload size in bytes
    pub max_payload_size: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 8083)
    /// - `NAMESPACE_PREFIX` - Namespace name prefix (default: `user-data-sessions`)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 120)
    /// - `IDLE_THRESHOLD` - Idle seconds before eviction (default: 120)
    /// - `DROP_IDLE_NAMESPACES` - Destroy evicted namespaces (default: true)
    /// - `WORKER_COUNT` - Worker pool size (default: 4)
    /// - `WORKER_BACKLOG` - Worker queue length (default: 32)
    /// - `MAX_PAYLOAD_SIZE` - Maximum payload bytes (default: 1 MB)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            namespace_prefix: env::var("NAMESPACE_PREFIX")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.namespace_prefix),
            sweep_interval: env_or("SWEEP_INTERVAL", defaults.sweep_interval),
            idle_threshold: env_or("IDLE_THRESHOLD", defaults.idle_threshold),
            drop_idle_namespaces: env_or("DROP_IDLE_NAMESPACES", defaults.drop_idle_namespaces),
            worker_count: env_or("WORKER_COUNT", defaults.worker_count),
            worker_backlog: env_or("WORKER_BACKLOG", defaults.worker_backlog),
            max_payload_size: env_or("MAX_PAYLOAD_SIZE", defaults.max_payload_size),
        }
    }

    /// Sweep period, never shorter than one second.
    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }

    pub fn idle_threshold_duration(&self) -> Duration {
        Duration::from_secs(self.idle_threshold)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8083,
            namespace_prefix: DEFAULT_NAMESPACE_PREFIX.to_string(),
            sweep_interval: 120,
            idle_threshold: 120,
            drop_idle_namespaces: true,
            worker_count: 4,
            worker_backlog: 32,
            max_payload_size: MAX_PAYLOAD_SIZE,
        }
    }
}
