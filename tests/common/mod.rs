//! Shared utilities for integration and load testing.

use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use forward_proxy::lifecycle::startup::build_context;
use forward_proxy::net::Listener;
use forward_proxy::{ProxyContext, ProxyServer, RuntimeConfig, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A proxy running on an ephemeral port with its files in a temp dir.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub context: Arc<ProxyContext>,
    shutdown: Shutdown,
    handle: JoinHandle<()>,
    dir: tempfile::TempDir,
}

impl TestProxy {
    pub fn access_log(&self) -> String {
        fs::read_to_string(self.dir.path().join("proxy.log")).unwrap_or_default()
    }

    pub fn metrics_file(&self) -> String {
        fs::read_to_string(self.dir.path().join("metrics.txt")).unwrap_or_default()
    }

    /// Trigger shutdown and wait for the accept loop and pool to finish.
    pub async fn stop(self) -> String {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("proxy did not stop in time")
            .expect("proxy task panicked");
        fs::read_to_string(self.dir.path().join("proxy.log")).unwrap_or_default()
    }
}

/// Start a proxy whose blocklist holds `blocked`.
pub async fn start_proxy(blocked: &[&str], workers: usize) -> TestProxy {
    let dir = tempfile::tempdir().unwrap();
    let blocklist = dir.path().join("blocked.txt");
    fs::write(&blocklist, blocked.join("\n")).unwrap();

    let config = RuntimeConfig {
        listen_address: "127.0.0.1".into(),
        thread_pool_size: workers,
        socket_timeout: 5,
        blocklist_file: blocklist.display().to_string(),
        log_file: dir.path().join("proxy.log").display().to_string(),
        metrics_file: dir.path().join("metrics.txt").display().to_string(),
        ..RuntimeConfig::default()
    };

    let context = Arc::new(build_context(config).unwrap());
    let listener = Listener::bind("127.0.0.1", 0).unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = ProxyServer::new(Arc::clone(&context));
    let server_shutdown = shutdown.clone();
    let handle = tokio::spawn(async move {
        server.serve(listener, &server_shutdown).await;
    });

    TestProxy {
        addr,
        context,
        shutdown,
        handle,
        dir,
    }
}

/// Start a mock backend that reads one request head per connection, reports
/// it on the returned channel, waits `delay`, writes `response` and closes.
pub async fn start_mock_backend(
    response: &'static [u8],
    delay: Duration,
) -> (SocketAddr, mpsc::UnboundedReceiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                let _ = tx.send(head);
                tokio::time::sleep(delay).await;
                let _ = socket.write_all(response).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

/// Start a backend that echoes every byte back until the peer closes.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut rx, mut tx) = socket.into_split();
                let _ = tokio::io::copy(&mut rx, &mut tx).await;
            });
        }
    });

    addr
}

/// A local port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Send `raw` to the proxy and collect everything it writes back.
pub async fn send_raw(proxy: SocketAddr, raw: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    stream.write_all(raw).await.unwrap();
    let mut reply = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut reply))
        .await
        .expect("proxy reply timed out")
        .unwrap();
    reply
}

async fn read_head(socket: &mut TcpStream) -> Vec<u8> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    head
}
