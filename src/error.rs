//! Error types for the preflight engine

use thiserror::Error;

/// Result type for preflight operations
pub type Result<T> = std::result::Result<T, PreflightError>;

/// Preflight errors
///
/// Everything a rule finds about the description is a [`crate::Diagnostic`], never one of
/// these. Errors are reserved for broken inputs detected before traversal starts, and for
/// cancellation.
#[derive(Error, Debug)]
pub enum PreflightError {
    #[error("Unknown validation rule: {0}")]
    UnknownRule(String),

    #[error("Invalid structured mime type '{entry}': {reason}")]
    InvalidMimeType { entry: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Schema reference at {location} does not exist in the document graph")]
    DanglingSchema { location: String },

    #[error("Schema {index} was reserved but never defined")]
    UndefinedSchema { index: usize },

    #[error("Validation cancelled after {completed} of {total} units")]
    Cancelled { completed: usize, total: usize },

    #[error("Logging already initialized: {0}")]
    Logging(String),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
