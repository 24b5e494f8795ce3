//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration, apply the CLI port override
//! - Load the blocklist, open the access log and the metrics snapshot
//! - Build the shared `ProxyContext`
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The listener binds last (traffic only when ready)

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::config::{read_config, validate_config, ConfigError, RuntimeConfig};
use crate::observability::metrics::install_prometheus_exporter;
use crate::observability::{AccessLog, MetricsRecorder};
use crate::proxy::ProxyContext;
use crate::security::{Blocklist, BlocklistError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Blocklist(#[from] BlocklistError),

    #[error("cannot open access log {path:?}: {source}")]
    AccessLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot start Prometheus exporter: {0}")]
    Exporter(String),
}

/// Parse a listen port given on the command line.
pub fn parse_listen_port(raw: &str) -> Result<u16, String> {
    let port: i64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid port number {raw:?}"))?;
    if !(1..=65535).contains(&port) {
        return Err(format!("port {port} is out of range 1-65535"));
    }
    Ok(port as u16)
}

/// Load the config file and apply an optional port override.
///
/// Validation runs after the override, so a command-line port replaces an
/// invalid configured one.
pub fn load_runtime_config(path: &Path, port_override: Option<u16>) -> Result<RuntimeConfig, StartupError> {
    let mut config = read_config(path)?;
    if let Some(port) = port_override {
        config.listen_port = port;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    tracing::debug!(path = ?path, "Configuration loaded");
    Ok(config)
}

/// Initialize every collaborator named by `config` and bundle them.
///
/// Writes the `SERVER START` boundary to the access log.
pub fn build_context(config: RuntimeConfig) -> Result<ProxyContext, StartupError> {
    let blocklist = Blocklist::load(Path::new(&config.blocklist_file))?;

    let log_path = PathBuf::from(&config.log_file);
    let access_log = AccessLog::open(&log_path, config.max_log_size)
        .map_err(|source| StartupError::AccessLog { path: log_path, source })?;

    let metrics = MetricsRecorder::new(&config.metrics_file);

    access_log.boundary("SERVER START");
    tracing::info!(
        listen = %config.bind_address(),
        workers = config.thread_pool_size,
        blocked_domains = blocklist.len(),
        socket_timeout_secs = config.socket_timeout,
        "Proxy initialized"
    );

    Ok(ProxyContext::new(Arc::new(config), blocklist, access_log, metrics))
}

/// Start the Prometheus exporter when an address is configured.
/// Must run inside a Tokio runtime.
pub fn start_exporter(config: &RuntimeConfig) -> Result<(), StartupError> {
    if config.prometheus_address.is_empty() {
        return Ok(());
    }
    let addr: SocketAddr = config
        .prometheus_address
        .parse()
        .map_err(|e| StartupError::Exporter(format!("{e}")))?;
    install_prometheus_exporter(addr).map_err(|e| StartupError::Exporter(e.to_string()))
}
