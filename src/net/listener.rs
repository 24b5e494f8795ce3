//! TCP listener implementation.
//!
//! # Responsibilities
//! - Bind to the configured address with address reuse enabled
//! - Listen with a large backlog
//! - Accept incoming TCP connections

use std::io;
use std::net::{IpAddr, SocketAddr};

use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket, TcpStream};

/// Pending-connection backlog passed to `listen(2)`.
pub const LISTEN_BACKLOG: u32 = 1024;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("invalid listen address {0:?}")]
    Address(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// A bound, listening TCP socket.
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind to `address:port`. Must be called from within a Tokio runtime.
    pub fn bind(address: &str, port: u16) -> Result<Self, ListenerError> {
        let ip: IpAddr = address
            .parse()
            .map_err(|_| ListenerError::Address(address.to_string()))?;
        let addr = SocketAddr::new(ip, port);
        let bind_err = |source| ListenerError::Bind { addr, source };

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .map_err(bind_err)?;
        socket.set_reuseaddr(true).map_err(bind_err)?;
        socket.bind(addr).map_err(bind_err)?;
        let inner = socket.listen(LISTEN_BACKLOG).map_err(bind_err)?;

        let local_addr = inner.local_addr().map_err(bind_err)?;
        tracing::info!(address = %local_addr, backlog = LISTEN_BACKLOG, "Listener bound");

        Ok(Self { inner })
    }

    /// Accept the next connection.
    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self.inner.accept().await?;
        tracing::debug!(peer_addr = %peer, "Connection accepted");
        Ok((stream, peer))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_ephemeral_port_and_accepts() {
        let listener = Listener::bind("127.0.0.1", 0).unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);

        let client = TcpStream::connect(addr).await.unwrap();
        let (_stream, peer) = listener.accept().await.unwrap();
        assert_eq!(peer, client.local_addr().unwrap());
    }

    #[tokio::test]
    async fn rejects_non_ip_address() {
        assert!(matches!(
            Listener::bind("not-an-ip", 0),
            Err(ListenerError::Address(_))
        ));
    }

    #[tokio::test]
    async fn port_in_use_is_a_bind_error() {
        let first = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = first.local_addr().unwrap().port();
        assert!(matches!(
            Listener::bind("127.0.0.1", port),
            Err(ListenerError::Bind { .. })
        ));
    }
}
