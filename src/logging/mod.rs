//! Logging and observability
//!
//! Structured logging with:
//! - Console output
//! - JSON-formatted file logs with rotation
//! - Configurable log levels
//!
//! # Example
//!
//! ```no_run
//! use catalogue_sync::logging::init_logging;
//! use catalogue_sync::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a stage run
///
/// # Example
///
/// ```no_run
/// use catalogue_sync::log_stage_start;
///
/// let date: Option<u32> = Some(20140522);
/// log_stage_start!("publish-specimen", date);
/// ```
#[macro_export]
macro_rules! log_stage_start {
    ($stage:expr, $date:expr) => {
        tracing::info!(
            stage = %$stage,
            date = ?$date,
            "Starting stage"
        );
    };
}

/// Log the completion of a stage run
///
/// # Example
///
/// ```no_run
/// use catalogue_sync::log_stage_complete;
/// use std::time::Duration;
///
/// log_stage_complete!("delete", 42, Duration::from_secs(10));
/// ```
#[macro_export]
macro_rules! log_stage_complete {
    ($stage:expr, $count:expr, $duration:expr) => {
        tracing::info!(
            stage = %$stage,
            count = $count,
            duration_ms = $duration.as_millis(),
            "Stage completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use catalogue_sync::log_error_with_context;
/// use catalogue_sync::domain::SyncError;
///
/// let error = SyncError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
