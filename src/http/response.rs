//! Fixed responses the proxy writes itself.

/// Reply to a request whose host is on the blocklist.
pub const FORBIDDEN: &[u8] = b"HTTP/1.0 403 Forbidden\r\nContent-Length: 0\r\n\r\n";

/// Reply to a CONNECT once the upstream connection is open.
pub const CONNECTION_ESTABLISHED: &[u8] = b"HTTP/1.0 200 Connection Established\r\n\r\n";
