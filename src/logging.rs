//! Diagnostic logging setup.
//!
//! The full-screen UI owns the terminal, so interactive sessions log to a
//! file. Headless commands may log to stderr instead.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::core::constants::LOG_FILTER_ENV;

const DEFAULT_FILTER: &str = "causerie=info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
    Off,
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "causerie=debug"
        } else {
            DEFAULT_FILTER
        })
    })
}

fn open_log_file(path: &Path) -> io::Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber. Calling it twice is harmless.
///
/// File output goes through a background writer; keep the returned guard
/// alive until exit so buffered lines are flushed.
pub fn init(target: &LogTarget, verbose: bool) -> io::Result<Option<WorkerGuard>> {
    match target {
        LogTarget::Off => Ok(None),
        LogTarget::Stderr => {
            let layer = fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(env_filter(verbose));
            let _ = tracing_subscriber::registry().with(layer).try_init();
            Ok(None)
        }
        LogTarget::File(path) => {
            let (writer, guard) = non_blocking(open_log_file(path)?);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_filter(env_filter(verbose));
            let _ = tracing_subscriber::registry().with(layer).try_init();
            Ok(Some(guard))
        }
    }
}
