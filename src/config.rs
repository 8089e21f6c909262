//! Configuration management for the preflight engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (preflight.toml)
//! - Environment variables (PREFLIGHT__*)
//!
//! ## Example config file (preflight.toml):
//! ```toml
//! [validation]
//! disabled_rules = ["GetWithBody"]
//! structured_mime_types = ["application/json;q=1", "text/plain;q=0.9"]
//! max_degree_of_parallelism = -1
//!
//! [logging]
//! filter = "openapi_preflight=debug"
//! ansi = false
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{PreflightError, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreflightConfig {
    /// Rule selection and execution settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Rule names to skip (case-insensitive); `All` disables every rule
    #[serde(default)]
    pub disabled_rules: Vec<String>,

    /// Content types whose payloads become generated models, `type/subtype[;q=weight]`
    #[serde(default = "default_structured_mime_types")]
    pub structured_mime_types: Vec<String>,

    /// Worker count for the rule fan-out; -1 uses every available CPU
    #[serde(default = "default_parallelism")]
    pub max_degree_of_parallelism: i32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Colored output
    #[serde(default = "default_true")]
    pub ansi: bool,
}

// Default value functions
fn default_structured_mime_types() -> Vec<String> {
    vec![
        "application/json;q=1".to_string(),
        "text/plain;q=0.9".to_string(),
        "application/x-www-form-urlencoded;q=0.2".to_string(),
        "multipart/form-data;q=0.1".to_string(),
    ]
}

fn default_parallelism() -> i32 {
    -1
}

fn default_filter() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            disabled_rules: Vec::new(),
            structured_mime_types: default_structured_mime_types(),
            max_degree_of_parallelism: default_parallelism(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            ansi: true,
        }
    }
}

impl ValidationConfig {
    pub fn with_disabled_rule(mut self, rule: impl Into<String>) -> Self {
        self.disabled_rules.push(rule.into());
        self
    }

    pub fn with_structured_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.structured_mime_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_degree_of_parallelism(mut self, workers: i32) -> Self {
        self.max_degree_of_parallelism = workers;
        self
    }

    /// Resolved worker count
    pub fn worker_count(&self) -> Result<usize> {
        match self.max_degree_of_parallelism {
            -1 => Ok(std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)),
            n if n >= 1 => Ok(n as usize),
            n => Err(PreflightError::InvalidConfig(format!(
                "max_degree_of_parallelism must be -1 or at least 1, got {}",
                n
            ))),
        }
    }
}

impl PreflightConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["preflight.toml", ".preflight.toml", "config/preflight.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "openapi", "preflight") {
            let xdg_config = config_dir.config_dir().join("preflight.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (PREFLIGHT__*)
        builder = builder.add_source(
            Environment::with_prefix("PREFLIGHT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
