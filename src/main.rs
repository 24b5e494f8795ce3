//! Forwarding HTTP proxy (v1)
//!
//! Accepts plain HTTP requests and CONNECT tunnels, checks the target host
//! against a blocklist, and relays bytes to the destination.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                   FORWARD PROXY                       │
//!                     │                                                       │
//!   Client ───────────┼─▶ listener ─▶ dispatcher ─▶ worker pool (FIFO)        │
//!                     │                                   │                   │
//!                     │                                   ▼                   │
//!                     │                        request parser ─▶ blocklist    │
//!                     │                                   │          │        │
//!                     │                                   │        403        │
//!                     │                                   ▼                   │
//!   Client ◀──────────┼──────────────────── forward / tunnel relay ◀──────────┼──── Upstream
//!                     │                                   │                   │
//!                     │                                   ▼                   │
//!                     │                      access log + metrics snapshot    │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use forward_proxy::lifecycle::signals::spawn_signal_listener;
use forward_proxy::lifecycle::startup::{build_context, load_runtime_config, parse_listen_port, start_exporter};
use forward_proxy::observability::init_tracing;
use forward_proxy::{ProxyServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "forward-proxy", version, about = "Forwarding HTTP proxy with CONNECT tunnelling and a domain blocklist")]
struct Cli {
    /// Listen port, overriding `listen_port` from the config file.
    #[arg(value_parser = parse_listen_port)]
    port: Option<u16>,

    /// Path to the key=value (or .toml) configuration file.
    #[arg(short, long, default_value = "config/proxy.conf")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_runtime_config(&cli.config, cli.port) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[ERROR] {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.log_level);
    tracing::info!("forward-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = start_exporter(&config) {
        tracing::error!(error = %e, "Startup failed");
        return ExitCode::FAILURE;
    }

    let context = match build_context(config) {
        Ok(context) => context,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let server = ProxyServer::new(context.into());
    if let Err(e) = server.start(&shutdown).await {
        tracing::error!(error = %e, "Failed to start listener");
        return ExitCode::FAILURE;
    }

    tracing::info!("Proxy stopped cleanly");
    ExitCode::SUCCESS
}
