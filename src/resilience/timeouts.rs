//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound every socket read, write and connect with the configured deadline
//! - Surface an elapsed deadline as an ordinary `io::ErrorKind::TimedOut`
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - A `None` deadline waits indefinitely (socket_timeout = 0)
//! - Timed-out operations are never retried

use std::future::Future;
use std::io;
use std::time::Duration;

/// Run `op` under an optional deadline.
pub async fn with_timeout<F, T>(deadline: Option<Duration>, op: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, op)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "socket operation timed out"))?,
        None => op.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn elapsed_deadline_is_timed_out() {
        let err = with_timeout(Some(Duration::from_millis(10)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, io::Error>(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn no_deadline_passes_result_through() {
        let value = with_timeout(None, async { Ok::<_, io::Error>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
