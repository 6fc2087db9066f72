//! Tracing configuration and log routing.
//!
//! Every binary gets a compact stdout layer filtered by `RUST_LOG` (default `info`). The HTTP
//! service also appends to a log file, `logs/resume-insights.log` unless
//! `RESUME_INSIGHTS_LOG_FILE` names another path. One-off tools log to stdout only unless they are
//! handed an explicit file.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_VAR: &str = "RESUME_INSIGHTS_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where log lines go besides stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Stdout only.
    Stdout,
    /// Stdout plus a non-blocking append-only file.
    File(PathBuf),
}

impl LogTarget {
    /// Target for a long-running service: the `RESUME_INSIGHTS_LOG_FILE` override, else
    /// `logs/{file_name}`.
    pub fn service(file_name: &str) -> Self {
        Self::File(service_log_path(
            std::env::var(LOG_FILE_VAR).ok().as_deref(),
            file_name,
        ))
    }

    /// Target for a command-line tool: the given file, else stdout only.
    pub fn tool(log_file: Option<PathBuf>) -> Self {
        log_file.map_or(Self::Stdout, Self::File)
    }
}

fn service_log_path(override_path: Option<&str>, file_name: &str) -> PathBuf {
    match override_path.map(str::trim).filter(|path| !path.is_empty()) {
        Some(path) => PathBuf::from(path),
        None => Path::new(DEFAULT_LOG_DIR).join(file_name),
    }
}

/// Install the global subscriber for `target`.
///
/// A file that cannot be opened is reported on stderr and logging continues on stdout.
pub fn init_tracing(target: LogTarget) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let writer = match &target {
        LogTarget::Stdout => None,
        LogTarget::File(path) => file_writer(path),
    };
    match writer {
        Some(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }

    if let LogTarget::File(path) = &target {
        tracing::debug!(path = %path.display(), "File logging enabled");
    }
}

fn file_writer(path: &Path) -> Option<NonBlocking> {
    let Some(file_name) = path.file_name() else {
        eprintln!("Log path {} has no file name", path.display());
        return None;
    };
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if let Err(err) = std::fs::create_dir_all(directory) {
        eprintln!("Failed to create log directory {}: {err}", directory.display());
        return None;
    }

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Some(non_blocking)
}
