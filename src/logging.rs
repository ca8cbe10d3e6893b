use crate::models::LoggingConfig;
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::fs;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn env_filter(debug_mode: bool) -> EnvFilter {
    // RUST_LOG wins over the configured level when present
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug_mode {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

/// Setup logging with a daily rotating file appender and optional console output.
///
/// # Arguments
/// * `config` - Log directory, file prefix, debug level and console switch
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging(config: &LoggingConfig) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_path = Utf8PathBuf::from(&config.dir);
    if !log_path.exists() {
        fs::create_dir_all(&log_path)
            .with_context(|| format!("Failed to create log directory: {}", config.dir))?;
    }

    let file_appender = rolling::daily(&config.dir, &config.prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = config.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(false)
            .with_thread_names(true)
    });

    tracing_subscriber::registry()
        .with(env_filter(config.debug))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}",
        config.dir,
        config.prefix,
        config.debug,
        config.console
    );

    Ok(guard)
}

/// Install a console-only subscriber for tests and demos.
///
/// Safe to call repeatedly; only the first call in a process installs anything.
pub fn try_init_test_logging() {
    let _ = tracing_subscriber::registry()
        .with(env_filter(true))
        .with(tracing_subscriber::fmt::layer().with_test_writer().with_thread_names(true))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_setup_logging_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("logs");
        let config = LoggingConfig {
            dir: log_dir.to_str().unwrap().to_string(),
            prefix: "test".to_string(),
            debug: false,
            console: false,
        };

        // Another test may already own the global subscriber; the directory is created either way
        let _ = setup_logging(&config);
        assert!(log_dir.exists());
    }

    #[test]
    fn test_try_init_test_logging_is_repeatable() {
        try_init_test_logging();
        try_init_test_logging();
        tracing::debug!("still fine");
    }
}
