//! Structured logging and the access log.
//!
//! Diagnostics go through `tracing` to stderr. The access log is a separate
//! append-only file with one timestamped line per handled request, rotated
//! by size with a single retained generation (`<path>.1`).

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const BOUNDARY: &str = "==================================================";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Size-rotated access log shared by all workers.
#[derive(Debug)]
pub struct AccessLog {
    inner: Mutex<LogFile>,
}

#[derive(Debug)]
struct LogFile {
    path: PathBuf,
    rotated: PathBuf,
    max_size: u64,
    file: File,
}

impl AccessLog {
    /// Open (or create) the log for appending. Parent directories are created.
    pub fn open(path: &Path, max_size: u64) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = open_append(path)?;

        let mut rotated = path.as_os_str().to_owned();
        rotated.push(".1");

        Ok(Self {
            inner: Mutex::new(LogFile {
                path: path.to_path_buf(),
                rotated: PathBuf::from(rotated),
                max_size,
                file,
            }),
        })
    }

    /// Append one `[YYYY-MM-DD HH:MM:SS] message` line, rotating first if the
    /// file has reached its size limit.
    pub fn log_event(&self, message: &str) {
        tracing::info!(target: "access", "{message}");

        let mut log = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = log.append(message) {
            tracing::warn!(path = ?log.path, error = %e, "Failed to write access log");
        }
    }

    /// Write a framed marker such as `SERVER START`.
    pub fn boundary(&self, label: &str) {
        self.log_event(BOUNDARY);
        self.log_event(label);
        self.log_event(BOUNDARY);
    }
}

impl LogFile {
    fn append(&mut self, message: &str) -> io::Result<()> {
        self.rotate_if_needed()?;
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(self.file, "[{stamp}] {message}")
    }

    fn rotate_if_needed(&mut self) -> io::Result<()> {
        let size = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        if size < self.max_size {
            return Ok(());
        }

        match fs::remove_file(&self.rotated) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
            _ => {}
        }
        fs::rename(&self.path, &self.rotated)?;
        self.file = open_append(&self.path)?;
        tracing::debug!(path = ?self.path, rotated = ?self.rotated, size, "Access log rotated");
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
