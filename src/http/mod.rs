//! HTTP layer.
//!
//! # Data Flow
//! ```text
//! Accepted client stream
//!     → request.rs (accumulate header, extract target, rewrite to HTTP/1.0)
//!     → ParsedRequest handed to the proxy handler
//!
//! Responses originated by the proxy:
//!     → response.rs (403 for blocked hosts, 200 for established tunnels)
//! ```
//!
//! # Design Decisions
//! - Only the request head is interpreted; bodies and tunnelled bytes are opaque
//! - No keep-alive: one request per client connection

pub mod request;
pub mod response;

pub use request::{parse_head, read_request, ParseError, ParsedRequest, ParserSettings, MAX_HEADER_BYTES};
