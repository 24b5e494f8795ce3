//! Per-connection orchestration.
//!
//! Parse → blocklist check → forward or tunnel → one access-log line and one
//! metrics update. The client stream is closed when the task is dropped at
//! the end of `handle_connection`, after the outcome has been recorded.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::Instrument;

use crate::http::response::FORBIDDEN;
use crate::http::{read_request, ParsedRequest};
use crate::net::connection::Task;
use crate::proxy::upstream::send_all;
use crate::proxy::{forward, tunnel, ProxyContext};

/// Outcome of a handled request, as recorded in the access log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Blocked,
    Allowed,
}

impl Outcome {
    pub fn tag(self) -> &'static str {
        match self {
            Outcome::Blocked => "BLOCKED",
            Outcome::Allowed => "ALLOWED",
        }
    }

    pub fn status(self) -> u16 {
        match self {
            Outcome::Blocked => 403,
            Outcome::Allowed => 200,
        }
    }
}

/// Access-log line for one request.
pub fn access_line(peer: SocketAddr, request: &ParsedRequest, outcome: Outcome, bytes: u64) -> String {
    format!(
        "{}:{} | \"{}\" | {} | {} | {} | bytes={}",
        peer.ip(),
        peer.port(),
        request.request_line(),
        request.authority(),
        outcome.tag(),
        outcome.status(),
        bytes
    )
}

/// Handle one accepted connection end-to-end.
pub async fn handle_connection(ctx: Arc<ProxyContext>, task: Task) {
    let span = tracing::debug_span!("connection", connection_id = %task.id, peer_addr = %task.peer);
    serve(ctx, task).instrument(span).await
}

async fn serve(ctx: Arc<ProxyContext>, mut task: Task) {
    let _guard = ctx.connections.track(task.id);

    let request = match read_request(&mut task.stream, &ctx.parser_settings()).await {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "Dropping unparseable request");
            return;
        }
    };
    tracing::debug!(method = %request.method, upstream = %request.authority(), "Request parsed");

    if ctx.blocklist.is_blocked(&request.host) {
        ctx.metrics.record_blocked();
        ctx.access_log
            .log_event(&access_line(task.peer, &request, Outcome::Blocked, 0));
        if let Err(e) = send_all(&mut task.stream, FORBIDDEN, &ctx.relay_settings()).await {
            tracing::debug!(error = %e, "Failed to send 403");
        }
        return;
    }

    let relay = ctx.relay_settings();
    let bytes = if request.is_connect() {
        tunnel(&mut task.stream, &request, &relay).await
    } else {
        forward(&mut task.stream, &request, &relay).await
    };

    ctx.metrics.record_allowed(&request.host, bytes);
    ctx.access_log
        .log_event(&access_line(task.peer, &request, Outcome::Allowed, bytes));
}
