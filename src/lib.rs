//! Forwarding / tunneling HTTP proxy library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod resilience;
pub mod security;

pub use config::RuntimeConfig;
pub use lifecycle::Shutdown;
pub use net::ProxyServer;
pub use proxy::ProxyContext;
