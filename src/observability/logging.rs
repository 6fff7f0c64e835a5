//! # Structured Logging
//!
//! Initializes the global tracing subscriber. Filtering is controlled with
//! `RUST_LOG` (default `info`); output format is selected by configuration
//! (`text` for local development, `json` for log aggregation).

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

/// Initialize the global tracing subscriber.
///
/// Safe to call once per process; later calls are ignored so tests that
/// build full application state don't panic on double initialization.
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };

    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}
