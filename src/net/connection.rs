//! Accepted connections and their lifetime tracking.
//!
//! # Responsibilities
//! - Wrap each accepted stream as a `Task` owned by exactly one worker
//! - Generate unique connection IDs for tracing
//! - Count connections that are being actively handled

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::TcpStream;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One accepted connection awaiting a worker.
///
/// The task owns the stream; dropping the task closes it.
#[derive(Debug)]
pub struct Task {
    pub id: ConnectionId,
    pub stream: TcpStream,
    pub peer: SocketAddr,
}

impl Task {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            id: ConnectionId::new(),
            stream,
            peer,
        }
    }

    pub fn client_ip(&self) -> IpAddr {
        self.peer.ip()
    }

    pub fn client_port(&self) -> u16 {
        self.peer.port()
    }
}

/// Counts connections currently held by a worker.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self, id: ConnectionId) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        metrics::gauge!("proxy_active_connections").increment(1.0);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id,
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a connection's lifetime.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::gauge!("proxy_active_connections").decrement(1.0);
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}
