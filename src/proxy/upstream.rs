//! Upstream connection setup shared by both relay modes.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::resilience::with_timeout;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("could not resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("{host} resolved to no addresses")]
    NoAddress { host: String },

    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("transfer failed: {0}")]
    Io(#[from] io::Error),
}

/// Per-relay socket settings.
#[derive(Debug, Clone, Copy)]
pub struct RelaySettings {
    /// Bytes moved per read.
    pub buffer_size: usize,
    /// Deadline for resolution, connect and every read/write.
    pub io_timeout: Option<Duration>,
}

/// Resolve `host` (first address only) and connect to it.
pub async fn connect_upstream(
    host: &str,
    port: u16,
    settings: &RelaySettings,
) -> Result<TcpStream, RelayError> {
    let mut addrs = with_timeout(settings.io_timeout, tokio::net::lookup_host((host, port)))
        .await
        .map_err(|source| RelayError::Resolve {
            host: host.to_string(),
            source,
        })?;
    let addr = addrs.next().ok_or_else(|| RelayError::NoAddress {
        host: host.to_string(),
    })?;

    let stream = with_timeout(settings.io_timeout, TcpStream::connect(addr))
        .await
        .map_err(|source| RelayError::Connect { addr, source })?;
    tracing::debug!(host, upstream_addr = %addr, "Upstream connected");
    Ok(stream)
}

/// Write all of `buf` under the relay deadline.
pub async fn send_all<W>(writer: &mut W, buf: &[u8], settings: &RelaySettings) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    with_timeout(settings.io_timeout, writer.write_all(buf)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RelaySettings {
        RelaySettings {
            buffer_size: 1024,
            io_timeout: Some(Duration::from_secs(2)),
        }
    }

    #[tokio::test]
    async fn connects_to_literal_address() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let stream = connect_upstream("127.0.0.1", port, &settings()).await.unwrap();
        assert_eq!(stream.peer_addr().unwrap().port(), port);
    }

    #[tokio::test]
    async fn refused_connection_is_a_connect_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = connect_upstream("127.0.0.1", port, &settings()).await.unwrap_err();
        assert!(matches!(err, RelayError::Connect { .. }));
    }

    #[tokio::test]
    async fn unresolvable_host_is_a_resolve_error() {
        let err = connect_upstream("no-such-host.invalid", 80, &settings())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RelayError::Resolve { .. } | RelayError::NoAddress { .. }
        ));
    }
}
