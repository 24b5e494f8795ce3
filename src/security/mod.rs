//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Parsed request:
//!     → blocklist.rs (exact / dot-suffix host match)
//!     → blocked: fixed 403, no upstream connection
//!     → allowed: hand off to the relay
//! ```
//!
//! # Design Decisions
//! - The deny-list is loaded once and is read-only afterwards
//! - Matching is literal; hosts are not lowercased or punycoded

pub mod blocklist;

pub use blocklist::{Blocklist, BlocklistError};
