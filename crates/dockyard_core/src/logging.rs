//! Tracing setup for hosts embedding the workspace engine.
//!
//! Interactive terminals get colored console output only. Everything else
//! (services, CI, detached runs) also writes daily rotating files under the
//! log directory; if that directory cannot be used, console output is kept.
//!
//! Filter priority: explicit filter > `DOCKYARD_LOG` > `RUST_LOG` > build default.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "DOCKYARD_LOG";

/// Environment variable overriding the log directory.
pub const LOG_DIR_ENV: &str = "DOCKYARD_LOG_DIR";

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Colored console output only.
    Console,
    /// Plain console output plus rotating files.
    ConsoleAndFile,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory for rotating log files.
    pub log_dir: PathBuf,
    /// Output selection.
    pub output: LogOutput,
    /// Filter directive overriding the environment.
    pub log_filter: Option<String>,
}

impl LogConfig {
    /// Console-only on a TTY, console and files otherwise.
    pub fn new(log_dir: PathBuf) -> Self {
        let output = if atty::is(atty::Stream::Stdout) {
            LogOutput::Console
        } else {
            LogOutput::ConsoleAndFile
        };
        Self { log_dir, output, log_filter: None }
    }

    /// Set a filter directive such as `dockyard_core::store=trace`.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    /// Force an output selection.
    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }
}

/// Keeps the file writer alive. Drop it last; dropping flushes pending lines.
pub struct LoggingGuard {
    worker: Option<WorkerGuard>,
}

impl LoggingGuard {
    /// Whether log lines also go to files.
    pub fn writes_files(&self) -> bool {
        self.worker.is_some()
    }
}

/// Install the global subscriber.
///
/// Installing twice is harmless: the second call keeps the first subscriber.
pub fn init_logging(config: LogConfig) -> LoggingGuard {
    let filter = config.log_filter.as_deref();
    match config.output {
        LogOutput::Console => console_only(filter),
        LogOutput::ConsoleAndFile => match console_and_file(&config) {
            Ok(worker) => LoggingGuard { worker: Some(worker) },
            Err(e) => {
                eprintln!(
                    "Warning: file logging unavailable in '{}': {e}. Logging to console only.",
                    config.log_dir.display()
                );
                console_only(filter)
            }
        },
    }
}

fn console_only(filter: Option<&str>) -> LoggingGuard {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(filter))
        .with_ansi(true)
        .with_target(false)
        .try_init();
    LoggingGuard { worker: None }
}

fn console_and_file(config: &LogConfig) -> Result<WorkerGuard, Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(&config.log_dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("dockyard")
        .filename_suffix("log")
        .build(&config.log_dir)?;
    let (file, worker) = tracing_appender::non_blocking(appender);

    // Console stays at INFO; files get whatever the filter lets through.
    let writer = std::io::stdout.with_max_level(tracing::Level::INFO).and(file);

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(env_filter(config.log_filter.as_deref()))
        .with_ansi(false)
        .with_target(true)
        .try_init()?;

    Ok(worker)
}

fn env_filter(explicit: Option<&str>) -> EnvFilter {
    let fallback = || EnvFilter::new(default_log_filter());
    match explicit {
        Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|_| fallback()),
        None => EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
            .unwrap_or_else(|_| fallback()),
    }
}

/// Build-type default filter. Per-action tracing lives at `trace` under
/// `dockyard_core::store`.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "debug,dockyard=trace,dockyard_core=debug,rusqlite=warn"
    } else {
        "info,dockyard=info,dockyard_core=info,rusqlite=warn"
    }
}

/// `DOCKYARD_LOG_DIR`, or `logs` under the data directory.
pub fn log_dir() -> PathBuf {
    std::env::var_os(LOG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| crate::services::storage::default_data_dir().join("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let config = LogConfig::new(PathBuf::from("/tmp/logs"))
            .with_filter("dockyard_core=trace")
            .with_output(LogOutput::Console);
        assert_eq!(config.log_filter.as_deref(), Some("dockyard_core=trace"));
        assert_eq!(config.output, LogOutput::Console);
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(default_log_filter()).is_ok());
    }

    #[test]
    fn test_unusable_log_dir_falls_back_to_console() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        let guard = init_logging(
            LogConfig::new(file.join("logs")).with_output(LogOutput::ConsoleAndFile),
        );
        assert!(!guard.writes_files());
    }
}
