//! Accept loop.
//!
//! # Responsibilities
//! - Bind the listener and start the worker pool
//! - Turn every accepted connection into a `Task` and enqueue it
//! - Stop accepting once the shutdown signal is set, then tear the pool down
//!
//! # Design Decisions
//! - Accept errors are transient unless shutdown is in progress
//! - Shutdown never cancels in-flight connections; the pool waits for them

use std::sync::Arc;

use crate::lifecycle::Shutdown;
use crate::net::connection::Task;
use crate::net::listener::{Listener, ListenerError};
use crate::net::pool::WorkerPool;
use crate::proxy::{handle_connection, ProxyContext};

/// The forwarding proxy server.
pub struct ProxyServer {
    context: Arc<ProxyContext>,
}

impl ProxyServer {
    pub fn new(context: Arc<ProxyContext>) -> Self {
        Self { context }
    }

    /// Bind the configured address and serve until `shutdown` is triggered.
    ///
    /// Bind failures are returned without entering the accept loop.
    pub async fn start(&self, shutdown: &Shutdown) -> Result<(), ListenerError> {
        let config = &self.context.config;
        let listener = Listener::bind(&config.listen_address, config.listen_port)?;
        self.serve(listener, shutdown).await;
        Ok(())
    }

    /// Run the accept loop on an already bound listener.
    pub async fn serve(&self, listener: Listener, shutdown: &Shutdown) {
        let context = Arc::clone(&self.context);
        let pool = WorkerPool::new(self.context.config.thread_pool_size, move |task: Task| {
            handle_connection(Arc::clone(&context), task)
        });

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, workers = pool.size(), "Proxy accepting connections");
        }

        let mut stop = shutdown.subscribe();
        loop {
            if shutdown.is_triggered() {
                break;
            }
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => pool.enqueue(Task::new(stream, peer)),
                    Err(e) => {
                        if shutdown.is_triggered() {
                            break;
                        }
                        tracing::debug!(error = %e, "Transient accept error");
                    }
                },
                _ = stop.recv() => break,
            }
        }

        // Closes the listening socket.
        drop(listener);
        self.context.access_log.boundary("SERVER STOP");
        pool.shutdown().await;
        tracing::info!("Server shutdown complete");
    }

    pub fn context(&self) -> &Arc<ProxyContext> {
        &self.context
    }
}
