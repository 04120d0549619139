//! Tracing subscriber setup
//!
//! Console output always, plus a daily rolling file when `logging.dir` is set.
//! The returned guard flushes the file writer and must live as long as the process.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

const LOG_FILE_NAME: &str = "homework-notifier.log";

/// Holds the background writer of the file layer, if any.
#[must_use = "dropping the logging context stops file logging"]
pub struct LoggingContext {
    _file_guard: Option<WorkerGuard>,
    file_path: Option<String>,
}

impl LoggingContext {
    /// Path of the active log file, when file logging is enabled
    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }
}

fn filter_for(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},reqwest=warn,hyper=warn", config.level)))
}

/// Install the global subscriber. Call once, at process start.
pub fn init(config: &LoggingConfig) -> LoggingContext {
    let (file_layer, guard, file_path) = match config.dir.as_deref().and_then(open_log_dir) {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false) // No color codes in file
                .with_target(true);
            let path = dir.join(LOG_FILE_NAME).display().to_string();
            (Some(layer), Some(guard), Some(path))
        }
        None => (None, None, None),
    };

    let console_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed()
    };

    let _ = tracing_subscriber::registry()
        .with(filter_for(config))
        .with(console_layer)
        .with(file_layer)
        .try_init();

    LoggingContext {
        _file_guard: guard,
        file_path,
    }
}

// `tracing_appender::rolling::daily` panics if it can't create the initial
// log file, so writability is checked up front.
fn open_log_dir(dir: &Path) -> Option<&Path> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!(
            "Warning: Could not create log directory {} ({}), file logging disabled",
            dir.display(),
            e
        );
        return None;
    }

    let test_path = dir.join(".homework_notifier_write_test");
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&test_path)
    {
        Ok(_) => {
            let _ = std::fs::remove_file(&test_path);
            Some(dir)
        }
        Err(e) => {
            eprintln!(
                "Warning: Could not write to log directory {} ({}), file logging disabled",
                dir.display(),
                e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_log_dir_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("logs").join("notifier");
        assert!(open_log_dir(&nested).is_some());
        assert!(nested.is_dir());
        assert!(!nested.join(".homework_notifier_write_test").exists());
    }
}
