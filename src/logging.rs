//! Tracing setup for the ingestion binary.
//!
//! Progress goes to stdout with a compact formatter. Setting `TGP_INGEST_LOG_FILE` mirrors the
//! same events, without ANSI colours, to that file; its parent directory is created on demand.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable naming the optional log file.
pub const LOG_FILE_VAR: &str = "TGP_INGEST_LOG_FILE";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber: stdout always, plus the log file when one is configured.
///
/// Respects `RUST_LOG` for filtering and defaults to `info`.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let file_layer = std::env::var_os(LOG_FILE_VAR)
        .filter(|value| !value.is_empty())
        .and_then(|value| file_writer(Path::new(&value)))
        .map(|writer| {
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact()
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();
}

/// Open a non-blocking appender for `path`, or report why it cannot be used and return `None`.
fn file_writer(path: &Path) -> Option<NonBlocking> {
    let (directory, file_name) = split_log_path(path)?;
    if let Err(err) = std::fs::create_dir_all(&directory) {
        eprintln!("Failed to create log directory {}: {err}", directory.display());
        return None;
    }
    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Some(writer)
}

/// Directory and file name of a log path; a bare file name lives in the working directory.
fn split_log_path(path: &Path) -> Option<(PathBuf, OsString)> {
    let file_name = path.file_name()?.to_os_string();
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((directory, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_path_splits_into_directory_and_name() {
        let (directory, name) = split_log_path(Path::new("/var/log/tgp/ingest.log")).expect("split");
        assert_eq!(directory, PathBuf::from("/var/log/tgp"));
        assert_eq!(name, OsString::from("ingest.log"));
    }

    #[test]
    fn bare_file_name_uses_working_directory() {
        let (directory, name) = split_log_path(Path::new("ingest.log")).expect("split");
        assert_eq!(directory, PathBuf::from("."));
        assert_eq!(name, OsString::from("ingest.log"));
    }

    #[test]
    fn directory_only_path_is_rejected() {
        assert!(split_log_path(Path::new("/")).is_none());
        assert!(split_log_path(Path::new("logs/..")).is_none());
    }

    #[test]
    fn file_writer_creates_missing_directories() {
        let root = tempfile::tempdir().expect("tempdir");
        let path = root.path().join("nested").join("ingest.log");
        assert!(file_writer(&path).is_some());
        assert!(root.path().join("nested").is_dir());
    }
}
