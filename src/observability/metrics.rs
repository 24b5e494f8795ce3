//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Count total/allowed/blocked requests, bytes relayed and per-host hits
//! - Rewrite a flat snapshot file after every recorded request
//! - Mirror the counters into the `metrics` facade for Prometheus scraping
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by outcome (allowed, blocked)
//! - `proxy_bytes_transferred_total` (counter): relayed bytes
//! - `proxy_active_connections` (gauge): connections held by a worker
//!
//! # Design Decisions
//! - One mutex serializes counter updates and snapshot writes
//! - Snapshot write failures are logged, never surfaced to the request path

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Number of hosts listed in the snapshot.
pub const TOP_HOSTS: usize = 5;

/// Install the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn install_prometheus_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

/// Point-in-time view of the aggregated counters.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub allowed_requests: u64,
    pub blocked_requests: u64,
    pub bytes_transferred: u64,
    pub requests_per_min: f64,
    /// Busiest hosts, highest count first.
    pub top_hosts: Vec<(String, u64)>,
}

impl MetricsSnapshot {
    /// Render the flat `key=value` snapshot file.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "total_requests={}", self.total_requests);
        let _ = writeln!(out, "allowed_requests={}", self.allowed_requests);
        let _ = writeln!(out, "blocked_requests={}", self.blocked_requests);
        let _ = writeln!(out, "bytes_transferred={}", self.bytes_transferred);
        let _ = writeln!(out, "requests_per_min={:.2}", self.requests_per_min);
        let hosts = self
            .top_hosts
            .iter()
            .map(|(host, count)| format!("{host}({count})"))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(out, "top_hosts={hosts}");
        out
    }
}

#[derive(Debug, Default)]
struct Counters {
    total: u64,
    allowed: u64,
    blocked: u64,
    bytes: u64,
    hosts: HashMap<String, u64>,
}

/// Request outcome aggregator backed by a snapshot file.
#[derive(Debug)]
pub struct MetricsRecorder {
    path: PathBuf,
    started: Instant,
    counters: Mutex<Counters>,
}

impl MetricsRecorder {
    /// Create a recorder and write an all-zero snapshot.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let recorder = Self {
            path: path.into(),
            started: Instant::now(),
            counters: Mutex::new(Counters::default()),
        };
        if let Some(parent) = recorder.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::warn!(path = ?parent, error = %e, "Could not create metrics directory");
            }
        }
        let counters = recorder.lock();
        recorder.persist(&counters);
        drop(counters);
        recorder
    }

    pub fn record_allowed(&self, host: &str, bytes: u64) {
        metrics::counter!("proxy_requests_total", "outcome" => "allowed").increment(1);
        metrics::counter!("proxy_bytes_transferred_total").increment(bytes);

        let mut counters = self.lock();
        counters.total += 1;
        counters.allowed += 1;
        counters.bytes += bytes;
        *counters.hosts.entry(host.to_string()).or_insert(0) += 1;
        self.persist(&counters);
    }

    pub fn record_blocked(&self) {
        metrics::counter!("proxy_requests_total", "outcome" => "blocked").increment(1);

        let mut counters = self.lock();
        counters.total += 1;
        counters.blocked += 1;
        self.persist(&counters);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.build_snapshot(&self.lock())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn build_snapshot(&self, counters: &Counters) -> MetricsSnapshot {
        let minutes = self.started.elapsed().as_secs_f64() / 60.0;
        let requests_per_min = if minutes > 0.0 {
            counters.total as f64 / minutes
        } else {
            0.0
        };

        let mut top_hosts: Vec<(String, u64)> = counters
            .hosts
            .iter()
            .map(|(host, count)| (host.clone(), *count))
            .collect();
        top_hosts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_hosts.truncate(TOP_HOSTS);

        MetricsSnapshot {
            total_requests: counters.total,
            allowed_requests: counters.allowed,
            blocked_requests: counters.blocked,
            bytes_transferred: counters.bytes,
            requests_per_min,
            top_hosts,
        }
    }

    /// Rewrite the snapshot file. Called with the counters lock held so
    /// writes land in update order.
    fn persist(&self, counters: &Counters) {
        let snapshot = self.build_snapshot(counters);
        if let Err(e) = fs::write(&self.path, snapshot.render()) {
            tracing::warn!(path = ?self.path, error = %e, "Failed to write metrics snapshot");
        }
    }
}
