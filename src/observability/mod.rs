//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every handled request produces:
//!     → logging.rs (one access-log line, rotated by size)
//!     → metrics.rs (counters + snapshot file, optional Prometheus)
//!
//! All subsystems additionally emit tracing events (stderr, EnvFilter).
//! ```
//!
//! # Design Decisions
//! - Access log and metrics each serialize behind their own mutex
//! - Neither lock is ever held while taking the other
//! - Write failures are reported through tracing and never fail a request

pub mod logging;
pub mod metrics;

pub use logging::{init_tracing, AccessLog};
pub use metrics::{MetricsRecorder, MetricsSnapshot};
