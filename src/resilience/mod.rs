//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Socket operation (client or upstream):
//!     → timeouts.rs (enforce per-operation deadline)
//!     → on failure: the relay ends, bytes so far are reported
//! ```
//!
//! # Design Decisions
//! - Timeouts are the only resilience mechanism; nothing is retried
//! - A stalled peer can hold a worker for at most one deadline per operation

pub mod timeouts;

pub use timeouts::with_timeout;
