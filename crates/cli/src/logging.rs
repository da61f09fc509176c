use crate::config::LogConfig;
use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable overriding the configured filter
pub const LOG_ENV: &str = "PENDMAP_LOG";

/// Install the global subscriber
///
/// Logs go to stderr, and also to a daily rolling file when a directory is
/// configured. Keep the returned guard alive until exit so buffered file
/// output is flushed. Fails before installing anything when the log
/// directory cannot be used.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(&config.level));

    let Some(dir) = &config.dir else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer())
            .init();
        return Ok(None);
    };

    let file_appender = file_appender(dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer())
        .init();

    Ok(Some(guard))
}

/// Stderr layer, generic over the subscriber it is stacked on
fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
}

/// Daily rolling appender writing files like pmx.2024-01-21.log
fn file_appender(dir: &Path) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("pmx")
        .filename_suffix("log")
        .build(dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_appender_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("logs").join("pmx");

        file_appender(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_unusable_log_directory_is_an_error() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let err = file_appender(&blocker.join("logs")).unwrap_err();
        assert!(err.to_string().contains("Failed to create log directory"));
    }
}
