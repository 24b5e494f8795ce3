//! Configuration schema definitions.
//!
//! `RuntimeConfig` is read once at startup and never mutated afterwards.
//! It derives `Deserialize` so `.toml` files can be deserialized directly;
//! the flat `key=value` format maps onto the same field names.

use std::time::Duration;

use serde::Deserialize;

/// Root configuration for the forwarding proxy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Address the listener binds to (e.g., "0.0.0.0").
    pub listen_address: String,

    /// Port the listener binds to.
    pub listen_port: u16,

    /// Number of long-lived connection workers.
    pub thread_pool_size: usize,

    /// Size of each socket read, in bytes.
    pub buffer_size: usize,

    /// Upstream port for plain HTTP requests that do not name one.
    pub default_http_port: u16,

    /// Access log path.
    pub log_file: String,

    /// Access log rotation threshold in bytes.
    pub max_log_size: u64,

    /// Blocklist file, one domain per line.
    pub blocklist_file: String,

    /// Per-operation socket timeout in seconds (0 disables it).
    pub socket_timeout: u64,

    /// Metrics snapshot file, rewritten on every recorded request.
    pub metrics_file: String,

    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Prometheus scrape endpoint (e.g., "127.0.0.1:9090"); empty disables it.
    pub prometheus_address: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0".to_string(),
            listen_port: 8080,
            thread_pool_size: 4,
            buffer_size: 4096,
            default_http_port: 80,
            log_file: "config/logs/proxy.log".to_string(),
            max_log_size: 5 * 1024 * 1024,
            blocklist_file: "config/blocked_sites.txt".to_string(),
            socket_timeout: 5,
            metrics_file: "config/metrics.txt".to_string(),
            log_level: "info".to_string(),
            prometheus_address: String::new(),
        }
    }
}

impl RuntimeConfig {
    /// Socket timeout applied to every client and upstream read/write.
    ///
    /// `None` when the configured value is zero.
    pub fn io_timeout(&self) -> Option<Duration> {
        match self.socket_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// `address:port` string the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_address, self.listen_port)
    }
}
