//! # Structured Logging
//!
//! One-shot initialization of the global `tracing` subscriber. `log`
//! records from dependencies are bridged into the same output.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::types::{Error, ErrorKind, Result};

// Flag to track if logging has been initialized
static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Configuration for the logging system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// The log level to use (trace, debug, info, warn, error)
    pub level: String,
    /// The service name, used as the log file name
    pub service_name: String,
    /// Whether to output logs to a file
    pub file_output: bool,
    /// The directory to store log files in
    pub log_dir: Option<String>,
    /// Whether to use JSON formatting
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            service_name: "quality-agent".to_string(),
            file_output: false,
            log_dir: None,
            json_format: false,
        }
    }
}

/// Initializes the structured logging system.
///
/// `RUST_LOG` takes precedence over `config.level`. Calling this more than
/// once is a no-op.
pub fn init_logging(config: Option<LoggingConfig>) -> Result<()> {
    if LOGGING_INITIALIZED.load(Ordering::SeqCst) {
        return Ok(());
    }

    let config = config.unwrap_or_default();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::new(ErrorKind::Initialization, format!("Invalid log level: {}", e)))?;

    let json_layer = config.json_format.then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_target(true)
            .with_writer(std::io::stderr)
    });
    // stdout stays free for command output
    let text_layer = (!config.json_format).then(|| fmt::layer().with_target(true).with_writer(std::io::stderr));

    let file_layer = match (config.file_output, config.log_dir.as_deref()) {
        (true, Some(log_dir)) => {
            let file_appender = RollingFileAppender::new(
                Rotation::DAILY,
                log_dir,
                format!("{}.log", config.service_name),
            );
            let (non_blocking, guard) = NonBlocking::new(file_appender);
            // The guard flushes on drop; keep it for the life of the process.
            Box::leak(Box::new(guard));
            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        _ => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| {
            Error::new(
                ErrorKind::Initialization,
                format!("Failed to set global subscriber: {}", e),
            )
        })?;

    LOGGING_INITIALIZED.store(true, Ordering::SeqCst);

    tracing::info!(
        service = %config.service_name,
        level = %config.level,
        json = %config.json_format,
        "Structured logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            ..LoggingConfig::default()
        };
        // Another test binary thread may already own the global subscriber;
        // either way a second call must not fail.
        let _ = init_logging(Some(config.clone()));
        if LOGGING_INITIALIZED.load(Ordering::SeqCst) {
            tokio_test::assert_ok!(init_logging(Some(config)));
        }
    }

    #[test]
    fn test_default_config_is_text() {
        let config = LoggingConfig::default();
        assert!(!config.json_format);
        assert!(!config.file_output);
        assert_eq!(config.level, "info");
    }
}
