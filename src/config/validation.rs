//! Configuration validation.
//!
//! Semantic checks that parsing cannot express. Returns every problem at
//! once rather than stopping at the first.

use std::net::IpAddr;

use thiserror::Error;

use crate::config::schema::RuntimeConfig;

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listen_address {0:?} is not an IP address")]
    ListenAddress(String),

    #[error("`{0}` must be between 1 and 65535")]
    Port(&'static str),

    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),

    #[error("prometheus_address {0:?} is not a socket address")]
    PrometheusAddress(String),
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &RuntimeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listen_address.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::ListenAddress(config.listen_address.clone()));
    }
    if config.listen_port == 0 {
        errors.push(ValidationError::Port("listen_port"));
    }
    if config.default_http_port == 0 {
        errors.push(ValidationError::Port("default_http_port"));
    }
    if config.thread_pool_size == 0 {
        errors.push(ValidationError::Zero("thread_pool_size"));
    }
    if config.buffer_size == 0 {
        errors.push(ValidationError::Zero("buffer_size"));
    }
    if config.max_log_size == 0 {
        errors.push(ValidationError::Zero("max_log_size"));
    }
    if !config.prometheus_address.is_empty()
        && config
            .prometheus_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::PrometheusAddress(
            config.prometheus_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
