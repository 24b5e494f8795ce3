//! Shutdown coordination for the proxy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// Process-wide shutdown signal.
///
/// A flag that transitions to `true` exactly once, plus a broadcast channel
/// that wakes an accept loop blocked on the listener. Cloning shares the
/// same signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    inner: Arc<ShutdownInner>,
}

#[derive(Debug)]
struct ShutdownInner {
    requested: AtomicBool,
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            inner: Arc::new(ShutdownInner {
                requested: AtomicBool::new(false),
                tx,
            }),
        }
    }

    /// Subscribe to the wake-up broadcast.
    ///
    /// Subscribers must still check `is_triggered`, since a trigger that
    /// happened before subscribing is not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.inner.tx.subscribe()
    }

    /// Trigger the shutdown signal. Later calls are no-ops.
    pub fn trigger(&self) {
        if !self.inner.requested.swap(true, Ordering::SeqCst) {
            tracing::info!("Shutdown requested");
            let _ = self.inner.tx.send(());
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
