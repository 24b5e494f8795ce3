//! Minimal HTTP request head parser.
//!
//! Two phases: accumulate bytes off the client until the blank line that ends
//! the header block, then extract method, target host, port and path. The
//! request line handed to the relay is always normalized to HTTP/1.0.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::resilience::with_timeout;

/// Upper bound on accumulated header bytes.
pub const MAX_HEADER_BYTES: usize = 8192;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const ABSOLUTE_HTTP_PREFIX: &str = "http://";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("request header exceeds 8192 bytes")]
    Oversized,

    #[error("client closed the connection before the header was complete")]
    Incomplete,

    #[error("read failed: {0}")]
    Read(#[from] io::Error),

    #[error("malformed request line")]
    MalformedRequestLine,

    #[error("request names no target host")]
    MissingHost,

    #[error("no Host header in origin-form request")]
    MissingHostHeader,

    #[error("invalid port {0:?}")]
    InvalidPort(String),
}

/// Knobs the parser takes from the runtime configuration.
#[derive(Debug, Clone, Copy)]
pub struct ParserSettings {
    /// Bytes requested per socket read.
    pub chunk_size: usize,
    /// Port used when a plain HTTP request does not name one.
    pub default_port: u16,
    /// Deadline for each individual read.
    pub read_timeout: Option<Duration>,
}

/// A parsed request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: String,
    pub host: String,
    pub port: u16,
    /// Empty for CONNECT.
    pub path: String,
    /// Header block to send upstream: the rewritten request line followed by
    /// the client's remaining bytes, unchanged.
    pub head: Vec<u8>,
}

impl ParsedRequest {
    pub fn is_connect(&self) -> bool {
        self.method == "CONNECT"
    }

    /// Normalized request line, as sent upstream and written to the access log.
    pub fn request_line(&self) -> String {
        format!("{} {} HTTP/1.0", self.method, self.path)
    }

    /// `host:port` of the upstream target.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read a request head off `reader` and parse it.
pub async fn read_request<R>(reader: &mut R, settings: &ParserSettings) -> Result<ParsedRequest, ParseError>
where
    R: AsyncRead + Unpin,
{
    let data = read_head(reader, settings).await?;
    parse_head(data, settings.default_port)
}

async fn read_head<R>(reader: &mut R, settings: &ParserSettings) -> Result<Vec<u8>, ParseError>
where
    R: AsyncRead + Unpin,
{
    let mut data = Vec::with_capacity(settings.chunk_size.min(MAX_HEADER_BYTES));
    let mut chunk = vec![0u8; settings.chunk_size];
    let mut scanned = 0;

    loop {
        let n = with_timeout(settings.read_timeout, reader.read(&mut chunk)).await?;
        if n == 0 {
            return Err(ParseError::Incomplete);
        }
        data.extend_from_slice(&chunk[..n]);

        if data.len() > MAX_HEADER_BYTES {
            return Err(ParseError::Oversized);
        }
        if find(&data[scanned..], HEADER_TERMINATOR).is_some() {
            return Ok(data);
        }
        // The terminator may straddle two reads.
        scanned = data.len().saturating_sub(HEADER_TERMINATOR.len() - 1);
    }
}

/// Parse an accumulated header block.
pub fn parse_head(data: Vec<u8>, default_port: u16) -> Result<ParsedRequest, ParseError> {
    let line_end = find(&data, b"\r\n").ok_or(ParseError::MalformedRequestLine)?;
    let request_line =
        std::str::from_utf8(&data[..line_end]).map_err(|_| ParseError::MalformedRequestLine)?;

    let (method, rest) = request_line
        .split_once(' ')
        .ok_or(ParseError::MalformedRequestLine)?;
    let (target, _version) = rest
        .split_once(' ')
        .ok_or(ParseError::MalformedRequestLine)?;
    if method.is_empty() {
        return Err(ParseError::MalformedRequestLine);
    }

    if method == "CONNECT" {
        let (host, port) = target.split_once(':').ok_or(ParseError::MissingHost)?;
        if host.is_empty() {
            return Err(ParseError::MissingHost);
        }
        let port = parse_port(port)?;
        let (method, host) = (method.to_string(), host.to_string());
        return Ok(ParsedRequest {
            method,
            host,
            port,
            path: String::new(),
            head: data,
        });
    }

    let (authority, path) = match target.strip_prefix(ABSOLUTE_HTTP_PREFIX) {
        Some(rest) => match rest.find('/') {
            Some(slash) => (rest[..slash].to_string(), rest[slash..].to_string()),
            None => (rest.to_string(), "/".to_string()),
        },
        None => {
            let host = host_header(&data).ok_or(ParseError::MissingHostHeader)?;
            (host, target.to_string())
        }
    };
    let (host, port) = split_authority(&authority, default_port)?;

    let method = method.to_string();
    let mut head = format!("{method} {path} HTTP/1.0").into_bytes();
    head.extend_from_slice(&data[line_end..]);

    Ok(ParsedRequest {
        method,
        host,
        port,
        path,
        head,
    })
}

/// Value of the first `Host:` header within the header block.
fn host_header(data: &[u8]) -> Option<String> {
    let block_end = find(data, HEADER_TERMINATOR).unwrap_or(data.len());
    let block = String::from_utf8_lossy(&data[..block_end]);

    block.split("\r\n").skip(1).find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.eq_ignore_ascii_case("host")
            .then(|| value.trim_start_matches(' ').trim_end().to_string())
    })
}

/// Split an optional `:port` suffix off a host.
fn split_authority(authority: &str, default_port: u16) -> Result<(String, u16), ParseError> {
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, "")) => (host, default_port),
        Some((host, port)) if port.bytes().all(|b| b.is_ascii_digit()) => (host, parse_port(port)?),
        _ => (authority, default_port),
    };
    if host.is_empty() {
        return Err(ParseError::MissingHost);
    }
    Ok((host.to_string(), port))
}

fn parse_port(port: &str) -> Result<u16, ParseError> {
    match port.parse::<u16>() {
        Ok(p) if p > 0 => Ok(p),
        _ => Err(ParseError::InvalidPort(port.to_string())),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    fn parse(raw: &str) -> Result<ParsedRequest, ParseError> {
        parse_head(raw.as_bytes().to_vec(), 80)
    }

    fn settings() -> ParserSettings {
        ParserSettings {
            chunk_size: 512,
            default_port: 80,
            read_timeout: Some(Duration::from_secs(2)),
        }
    }

    #[test]
    fn connect_target() {
        let req = parse("CONNECT example.com:443 HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.method, "CONNECT");
        assert_eq!(req.host, "example.com");
        assert_eq!(req.port, 443);
        assert_eq!(req.path, "");
        assert!(req.is_connect());
        assert_eq!(req.request_line(), "CONNECT  HTTP/1.0");
    }

    #[test]
    fn absolute_uri_is_rewritten() {
        let req = parse("GET http://example.com/a HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
        assert_eq!(req.host, "example.com");
        assert_eq!(req.port, 80);
        assert_eq!(req.path, "/a");
        assert_eq!(req.request_line(), "GET /a HTTP/1.0");
        assert_eq!(req.head, b"GET /a HTTP/1.0\r\nHost: example.com\r\n\r\n".to_vec());
    }

    #[test]
    fn absolute_uri_without_path_defaults_to_root() {
        let req = parse("HEAD http://example.com HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.path, "/");
        assert_eq!(req.head, b"HEAD / HTTP/1.0\r\n\r\n".to_vec());
    }

    #[test]
    fn absolute_uri_port_is_honoured() {
        let req = parse("GET http://127.0.0.1:8081/x HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.host, "127.0.0.1");
        assert_eq!(req.port, 8081);
        assert_eq!(req.authority(), "127.0.0.1:8081");
    }

    #[test]
    fn origin_form_reads_host_header() {
        let req = parse("POST /submit HTTP/1.1\r\nUser-Agent: t\r\nHost:    api.example.com\r\n\r\nbody").unwrap();
        assert_eq!(req.host, "api.example.com");
        assert_eq!(req.path, "/submit");
        assert_eq!(req.port, 80);
        assert!(req.head.starts_with(b"POST /submit HTTP/1.0\r\nUser-Agent: t\r\n"));
        assert!(req.head.ends_with(b"\r\n\r\nbody"));
    }

    #[test]
    fn origin_form_without_host_header_fails() {
        let err = parse("GET /a HTTP/1.1\r\nAccept: */*\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingHostHeader));
    }

    #[test]
    fn missing_separators_fail() {
        assert!(matches!(parse("GARBAGE\r\n\r\n"), Err(ParseError::MalformedRequestLine)));
        assert!(matches!(parse("GET /only-one-space\r\n\r\n"), Err(ParseError::MalformedRequestLine)));
    }

    #[test]
    fn connect_requires_host_and_port() {
        assert!(matches!(parse("CONNECT example.com HTTP/1.1\r\n\r\n"), Err(ParseError::MissingHost)));
        assert!(matches!(parse("CONNECT :443 HTTP/1.1\r\n\r\n"), Err(ParseError::MissingHost)));
        assert!(matches!(parse("CONNECT example.com:https HTTP/1.1\r\n\r\n"), Err(ParseError::InvalidPort(_))));
        assert!(matches!(parse("CONNECT example.com:70000 HTTP/1.1\r\n\r\n"), Err(ParseError::InvalidPort(_))));
    }

    #[test]
    fn empty_authority_fails() {
        assert!(matches!(parse("GET http:///a HTTP/1.1\r\n\r\n"), Err(ParseError::MissingHost)));
    }

    #[tokio::test]
    async fn reads_across_partial_chunks() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            for piece in ["CONNECT exa", "mple.com:44", "3 HTTP/1.1\r", "\n\r", "\n"] {
                client.write_all(piece.as_bytes()).await.unwrap();
                tokio::task::yield_now().await;
            }
            client
        });

        let req = read_request(&mut server, &settings()).await.unwrap();
        assert_eq!(req.host, "example.com");
        assert_eq!(req.port, 443);
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn oversized_header_fails() {
        let (mut client, mut server) = tokio::io::duplex(16 * 1024);
        let mut raw = b"GET / HTTP/1.1\r\nX-Fill: ".to_vec();
        raw.resize(MAX_HEADER_BYTES + 100, b'a');
        client.write_all(&raw).await.unwrap();

        let err = read_request(&mut server, &settings()).await.unwrap_err();
        assert!(matches!(err, ParseError::Oversized));
    }

    #[tokio::test]
    async fn early_eof_is_incomplete() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client.write_all(b"GET / HTTP/1.1\r\nHost: a\r\n").await.unwrap();
        drop(client);

        let err = read_request(&mut server, &settings()).await.unwrap_err();
        assert!(matches!(err, ParseError::Incomplete));
    }

    #[tokio::test]
    async fn silent_client_times_out() {
        let (_client, mut server) = tokio::io::duplex(1024);
        let settings = ParserSettings {
            read_timeout: Some(Duration::from_millis(20)),
            ..settings()
        };

        let err = read_request(&mut server, &settings).await.unwrap_err();
        assert!(matches!(err, ParseError::Read(ref e) if e.kind() == io::ErrorKind::TimedOut));
    }
}
