//! Two-way byte pump for CONNECT.
//!
//! After the upstream connection opens, the client gets the 200 handshake
//! and bytes are copied verbatim in both directions. Whichever side is
//! readable is drained on each iteration; EOF or an error on either side,
//! or a failed forwarding write, ends the whole tunnel.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::http::response::CONNECTION_ESTABLISHED;
use crate::http::ParsedRequest;
use crate::proxy::upstream::{connect_upstream, send_all, RelayError, RelaySettings};

/// Run the tunnel and return the bytes moved in both directions combined.
pub async fn tunnel<C>(client: &mut C, request: &ParsedRequest, settings: &RelaySettings) -> u64
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    let mut relayed = 0;
    if let Err(e) = pump(client, request, settings, &mut relayed).await {
        tracing::debug!(
            upstream = %request.authority(),
            bytes = relayed,
            error = %e,
            "Tunnel ended with error"
        );
    }
    relayed
}

async fn pump<C>(
    client: &mut C,
    request: &ParsedRequest,
    settings: &RelaySettings,
    relayed: &mut u64,
) -> Result<(), RelayError>
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    let mut upstream = connect_upstream(&request.host, request.port, settings).await?;
    send_all(client, CONNECTION_ESTABLISHED, settings).await?;

    let (mut client_rx, mut client_tx) = tokio::io::split(client);
    let (mut upstream_rx, mut upstream_tx) = upstream.split();
    let mut client_buf = vec![0u8; settings.buffer_size];
    let mut upstream_buf = vec![0u8; settings.buffer_size];

    // The readiness wait is unbounded; only forwarding writes carry a deadline.
    loop {
        tokio::select! {
            read = client_rx.read(&mut client_buf) => {
                let n = read?;
                if n == 0 {
                    return Ok(());
                }
                send_all(&mut upstream_tx, &client_buf[..n], settings).await?;
                *relayed += n as u64;
            }
            read = upstream_rx.read(&mut upstream_buf) => {
                let n = read?;
                if n == 0 {
                    return Ok(());
                }
                send_all(&mut client_tx, &upstream_buf[..n], settings).await?;
                *relayed += n as u64;
            }
        }
    }
}
