//! Proxy core: per-connection handling and the two relay modes.
//!
//! # Data Flow
//! ```text
//! Task (from a worker)
//!     → handler.rs (parse, blocklist, outcome recording)
//!     → forward.rs (plain HTTP: request up, response down)
//!     → tunnel.rs  (CONNECT: bidirectional pump)
//!     → upstream.rs (resolve first address, connect, deadline-bound writes)
//! ```
//!
//! # Design Decisions
//! - Exactly one upstream connection per client connection
//! - Upstream failures are recorded as ALLOWED with zero bytes
//! - No retries; per-operation timeouts bound how long a peer can stall

pub mod forward;
pub mod handler;
pub mod tunnel;
pub mod upstream;

use std::sync::Arc;

pub use forward::forward;
pub use handler::{handle_connection, Outcome};
pub use tunnel::tunnel;
pub use upstream::{RelayError, RelaySettings};

use crate::config::RuntimeConfig;
use crate::http::ParserSettings;
use crate::net::connection::ConnectionTracker;
use crate::observability::{AccessLog, MetricsRecorder};
use crate::security::Blocklist;

/// Everything a worker needs to handle a connection. Built once at startup
/// and shared read-only between workers.
#[derive(Debug)]
pub struct ProxyContext {
    pub config: Arc<RuntimeConfig>,
    pub blocklist: Blocklist,
    pub access_log: AccessLog,
    pub metrics: MetricsRecorder,
    pub connections: ConnectionTracker,
}

impl ProxyContext {
    pub fn new(
        config: Arc<RuntimeConfig>,
        blocklist: Blocklist,
        access_log: AccessLog,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            config,
            blocklist,
            access_log,
            metrics,
            connections: ConnectionTracker::new(),
        }
    }

    pub fn parser_settings(&self) -> ParserSettings {
        ParserSettings {
            chunk_size: self.config.buffer_size,
            default_port: self.config.default_http_port,
            read_timeout: self.config.io_timeout(),
        }
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            buffer_size: self.config.buffer_size,
            io_timeout: self.config.io_timeout(),
        }
    }
}
