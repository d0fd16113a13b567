use anyhow::Result;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::error::PermitError;

/// Initialize logging system
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let mut layers = Vec::new();

    // Console layer
    if config.console_enabled {
        let console_layer = fmt::layer().with_target(false).with_writer(std::io::stdout).boxed();
        layers.push(console_layer);
    }

    // File layer
    if config.file_enabled {
        std::fs::create_dir_all(&config.log_directory)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(&config.file_prefix)
            .filename_suffix("log")
            .max_log_files(config.max_files)
            .build(&config.log_directory)?;

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(file_appender)
            .boxed();
        layers.push(file_layer);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if config.file_enabled {
        info!("Log directory: {}", config.log_directory.display());
    }

    Ok(())
}

/// Structured fields attached to a log entry
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogContext {
    pub component: &'static str,
    pub operation: &'static str,
    pub county: Option<String>,
    pub url: Option<String>,
    pub duration_ms: Option<u64>,
    pub status: Option<String>,
    pub error_category: Option<String>,
    pub record_count: Option<u64>,
}

impl LogContext {
    pub fn new(component: &'static str, operation: &'static str) -> Self {
        Self {
            component,
            operation,
            ..Default::default()
        }
    }

    pub fn with_county(mut self, county: impl Into<String>) -> Self {
        self.county = Some(county.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = Some(duration.as_millis() as u64);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_error_category(mut self, category: impl Into<String>) -> Self {
        self.error_category = Some(category.into());
        self
    }

    pub fn with_record_count(mut self, count: usize) -> Self {
        self.record_count = Some(count as u64);
        self
    }
}

/// Structured logging macros
#[macro_export]
macro_rules! log_info {
    ($context:expr, $($arg:tt)+) => {
        tracing::info!(
            component = $context.component,
            operation = $context.operation,
            county = $context.county,
            url = $context.url,
            duration_ms = $context.duration_ms,
            status = $context.status,
            record_count = $context.record_count,
            $($arg)+
        )
    };
}

#[macro_export]
macro_rules! log_warn {
    ($context:expr, $($arg:tt)+) => {
        tracing::warn!(
            component = $context.component,
            operation = $context.operation,
            county = $context.county,
            url = $context.url,
            duration_ms = $context.duration_ms,
            status = $context.status,
            error_category = $context.error_category,
            record_count = $context.record_count,
            $($arg)+
        )
    };
}

#[macro_export]
macro_rules! log_error {
    ($context:expr, $($arg:tt)+) => {
        tracing::error!(
            component = $context.component,
            operation = $context.operation,
            county = $context.county,
            url = $context.url,
            duration_ms = $context.duration_ms,
            status = $context.status,
            error_category = $context.error_category,
            $($arg)+
        )
    };
}

/// Times an operation and logs its outcome with the elapsed duration
pub struct PerformanceLogger {
    context: LogContext,
    start_time: Instant,
}

impl PerformanceLogger {
    pub fn new(context: LogContext) -> Self {
        Self {
            context,
            start_time: Instant::now(),
        }
    }

    pub fn finish(self, message: &str, record_count: usize) {
        let context = self
            .context
            .with_duration(self.start_time.elapsed())
            .with_status("completed")
            .with_record_count(record_count);
        log_info!(context, "{}", message);
    }

    pub fn finish_with_error(self, message: &str, error: &PermitError) {
        let context = self
            .context
            .with_duration(self.start_time.elapsed())
            .with_status("failed")
            .with_error_category(error.category());
        log_error!(context, error = %error, "{}", message);
    }
}
