//! One-way relay for plain HTTP requests.
//!
//! Sends the rewritten request head upstream, then streams the response back
//! to the client until the upstream closes or any operation fails.

use tokio::io::{AsyncReadExt, AsyncWrite};

use crate::http::ParsedRequest;
use crate::proxy::upstream::{connect_upstream, send_all, RelayError, RelaySettings};
use crate::resilience::with_timeout;

/// Relay `request` and return the number of response bytes written to the
/// client. Zero covers both empty responses and unreachable upstreams.
pub async fn forward<C>(client: &mut C, request: &ParsedRequest, settings: &RelaySettings) -> u64
where
    C: AsyncWrite + Unpin,
{
    let mut relayed = 0;
    if let Err(e) = stream_response(client, request, settings, &mut relayed).await {
        tracing::debug!(
            upstream = %request.authority(),
            bytes = relayed,
            error = %e,
            "Forward relay ended early"
        );
    }
    relayed
}

async fn stream_response<C>(
    client: &mut C,
    request: &ParsedRequest,
    settings: &RelaySettings,
    relayed: &mut u64,
) -> Result<(), RelayError>
where
    C: AsyncWrite + Unpin,
{
    let mut upstream = connect_upstream(&request.host, request.port, settings).await?;
    send_all(&mut upstream, &request.head, settings).await?;

    let mut buf = vec![0u8; settings.buffer_size];
    loop {
        let n = with_timeout(settings.io_timeout, upstream.read(&mut buf)).await?;
        if n == 0 {
            return Ok(());
        }
        send_all(client, &buf[..n], settings).await?;
        *relayed += n as u64;
    }
}
