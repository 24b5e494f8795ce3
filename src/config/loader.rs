//! Configuration loading from disk.
//!
//! Two formats are accepted: the flat `key=value` proxy.conf format, and
//! TOML for files ending in `.toml`. Both feed the same validation pass.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::RuntimeConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("line {line}: invalid value {value:?} for `{key}`")]
    InvalidValue {
        line: usize,
        key: String,
        value: String,
    },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a file.
pub fn load_config(path: &Path) -> Result<RuntimeConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Read a config file without validating it, so callers can apply
/// overrides first.
pub fn read_config(path: &Path) -> Result<RuntimeConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if path.extension().is_some_and(|ext| ext == "toml") {
        Ok(toml::from_str(&content)?)
    } else {
        parse_key_values(&content)
    }
}

/// Parse the `key=value` format on top of the defaults.
///
/// Blank lines, `#` comments and lines without `=` are skipped; unknown
/// keys are ignored.
pub fn parse_key_values(content: &str) -> Result<RuntimeConfig, ConfigError> {
    let mut config = RuntimeConfig::default();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        let line_no = idx + 1;

        match key {
            "listen_address" => config.listen_address = value.to_string(),
            "listen_port" => config.listen_port = parse_value(line_no, key, value)?,
            "thread_pool_size" => config.thread_pool_size = parse_value(line_no, key, value)?,
            "buffer_size" => config.buffer_size = parse_value(line_no, key, value)?,
            "default_http_port" => config.default_http_port = parse_value(line_no, key, value)?,
            "log_file" => config.log_file = value.to_string(),
            "max_log_size" => config.max_log_size = parse_value(line_no, key, value)?,
            "blocklist_file" => config.blocklist_file = value.to_string(),
            "socket_timeout" => config.socket_timeout = parse_value(line_no, key, value)?,
            "metrics_file" => config.metrics_file = value.to_string(),
            "log_level" => config.log_level = value.to_string(),
            "prometheus_address" => config.prometheus_address = value.to_string(),
            _ => tracing::debug!(line = line_no, key, "Ignoring unknown config key"),
        }
    }

    Ok(config)
}

fn parse_value<T: FromStr>(line: usize, key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        line,
        key: key.to_string(),
        value: value.to_string(),
    })
}
