//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Translate the first signal into a graceful shutdown
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A second SIGTERM/SIGINT forces an immediate exit

use std::io;

use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

/// Exit status used when a second signal cuts the graceful shutdown short.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Spawn a task that triggers `shutdown` on SIGINT/SIGTERM.
pub fn spawn_signal_listener(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = wait_for_termination().await {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return;
        }
        tracing::info!("Termination signal received, stopping accept loop");
        shutdown.trigger();

        if wait_for_termination().await.is_ok() {
            tracing::warn!("Second termination signal received, exiting immediately");
            std::process::exit(FORCED_EXIT_CODE);
        }
    })
}

/// Wait for SIGINT or SIGTERM.
#[cfg(unix)]
pub async fn wait_for_termination() -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

/// Wait for Ctrl+C.
#[cfg(not(unix))]
pub async fn wait_for_termination() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}
