//! Log setup and diagnostic rendering

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::diagnostics::{Diagnostics, Severity};
use crate::error::{PreflightError, Result};

/// Install the global fmt subscriber. `RUST_LOG` wins over the configured filter.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(config))
        .with_ansi(config.ansi)
        .try_init()
        .map_err(|e| PreflightError::Logging(e.to_string()))
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// One event per diagnostic, `"<severity>: <location> - <message>"`, sorted by location
pub fn log_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.sorted() {
        match diagnostic.severity {
            Severity::Warning => tracing::warn!(rule = %diagnostic.rule, "{}", diagnostic),
            Severity::Error => tracing::error!(rule = %diagnostic.rule, "{}", diagnostic),
        }
    }
}
