//! Logging Module
//!
//! Unified tracing setup for the conversion tools:
//! - human-readable output on stderr
//! - optional daily-rolling log file in a chosen directory
//! - `RUST_LOG` overrides the configured level
//!
//! # Examples
//!
//! ```no_run
//! use shared_utils::logging::{LogConfig, init_logging};
//! use tracing::info;
//!
//! let config = LogConfig::default();
//! init_logging("heic_convert", config).expect("Failed to initialize logging");
//!
//! info!("Program started");
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory for the rolling log file; `None` logs to stderr only
    pub log_dir: Option<PathBuf>,
    /// Number of rotated log files to keep
    pub max_files: usize,
    /// Level used when `RUST_LOG` is not set
    pub level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            max_files: 5,
            level: Level::INFO,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.log_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_max_files(mut self, count: usize) -> Self {
        self.max_files = count;
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Directive used when `RUST_LOG` is absent, scoped to the program's own crates.
    pub fn default_directive(&self, program_name: &str) -> String {
        let level = self.level.to_string().to_lowercase();
        format!("{}={},shared_utils={}", program_name, level, level)
    }
}

/// Install the global tracing subscriber.
///
/// Returns an error instead of panicking when a subscriber is already set,
/// so tests and embedding callers can call it more than once. When the log
/// directory cannot be created, stderr logging is still installed and the
/// directory error is returned afterwards.
pub fn init_logging(program_name: &str, config: LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive(program_name)));

    let log_file_name = format!("{}.log", program_name);

    let (file_layer, file_error) = match config.log_dir.as_ref() {
        Some(dir) => match std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {:?}", dir))
        {
            Ok(()) => {
                let appender = RollingFileAppender::new(Rotation::DAILY, dir, &log_file_name);
                let layer = fmt::layer()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true);
                (Some(layer), None)
            }
            Err(e) => (None, Some(e)),
        },
        None => (None, None),
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(
        program = program_name,
        log_dir = ?config.log_dir,
        level = ?config.level,
        "Logging system initialized"
    );

    if let Some(e) = file_error {
        tracing::warn!(error = %format!("{:#}", e), "File logging disabled, using stderr only");
        return Err(e);
    }

    if let Some(dir) = config.log_dir.as_ref() {
        cleanup_old_logs(dir, program_name, config.max_files)?;
    }

    Ok(())
}

/// Keep only the newest `max_files` log files written for `program_name`.
fn cleanup_old_logs(log_dir: &Path, program_name: &str, max_files: usize) -> Result<()> {
    use std::fs;

    let entries = fs::read_dir(log_dir)
        .with_context(|| format!("Failed to read log directory: {:?}", log_dir))?;

    let mut log_files: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();

    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        let is_ours = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with(program_name))
            .unwrap_or(false);
        if !is_ours || !path.to_string_lossy().contains(".log") {
            continue;
        }

        if let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) {
            log_files.push((path, modified));
        }
    }

    if log_files.len() > max_files {
        log_files.sort_by(|a, b| b.1.cmp(&a.1));

        for (path, _) in log_files.iter().skip(max_files) {
            if let Err(e) = fs::remove_file(path) {
                tracing::warn!(path = ?path, error = %e, "Failed to remove old log file");
            } else {
                tracing::debug!(path = ?path, "Removed old log file");
            }
        }
    }

    Ok(())
}

/// Record the end of a long-running operation.
pub fn log_operation_end(operation: &str, duration: std::time::Duration, success: bool) {
    if success {
        tracing::info!(
            operation = operation,
            duration_secs = duration.as_secs_f64(),
            "Operation completed successfully"
        );
    } else {
        tracing::error!(
            operation = operation,
            duration_secs = duration.as_secs_f64(),
            "Operation failed"
        );
    }
}
