//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind with SO_REUSEADDR, accept)
//!     → dispatcher.rs (accept loop, wrap as Task, shutdown observation)
//!     → pool.rs (FIFO queue, fixed set of workers)
//!     → connection.rs (task ownership, connection IDs, active tracking)
//!     → Hand off to the proxy handler
//! ```
//!
//! # Design Decisions
//! - The pool size bounds concurrent connections; excess connections queue
//! - A task owns its stream, so every exit path closes it

pub mod connection;
pub mod dispatcher;
pub mod listener;
pub mod pool;

pub use connection::{ConnectionId, ConnectionTracker, Task};
pub use dispatcher::ProxyServer;
pub use listener::{Listener, ListenerError};
pub use pool::WorkerPool;
