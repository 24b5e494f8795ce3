//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (key=value or TOML)
//!     → loader.rs (parse)
//!     → validation.rs (semantic checks)
//!     → RuntimeConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - The CLI port override is applied before the config is shared

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use validation::validate_config;
pub use schema::RuntimeConfig;
