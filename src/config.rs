//! Transpiler configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{TranspileError, TranspileResult};
use crate::transpiler::Dialect;

/// Main transpiler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranspilerConfig {
    /// Target backend
    #[serde(default)]
    pub dialect: Dialect,

    /// Years added to datetime literals and NOW()/UTC()
    #[serde(default)]
    pub year_offset: i32,

    /// tracing filter used by the CLI when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Terminate every DML statement with `;`
    #[serde(default = "default_true")]
    pub terminate_statements: bool,
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for TranspilerConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            year_offset: 0,
            log_level: default_log_level(),
            terminate_statements: true,
        }
    }
}

impl TranspilerConfig {
    /// Create a new configuration builder
    pub fn builder() -> TranspilerConfigBuilder {
        TranspilerConfigBuilder::default()
    }

    pub fn from_toml(text: &str) -> TranspileResult<Self> {
        toml::from_str(text).map_err(|e| TranspileError::Config(e.to_string()))
    }

    /// Load the configuration file.
    ///
    /// An explicit path must exist. Otherwise `./scriptql.toml` and then the
    /// user config directory are tried, falling back to defaults.
    pub fn load(explicit: Option<&Path>) -> TranspileResult<Self> {
        if let Some(path) = explicit {
            let text = std::fs::read_to_string(path)?;
            return Self::from_toml(&text);
        }

        for candidate in Self::search_paths() {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "loading config");
                let text = std::fs::read_to_string(&candidate)?;
                return Self::from_toml(&text);
            }
        }

        Ok(Self::default())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("scriptql.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("scriptql").join("config.toml"));
        }
        paths
    }
}

/// Builder for TranspilerConfig
#[derive(Debug, Default)]
pub struct TranspilerConfigBuilder {
    config: TranspilerConfig,
}

impl TranspilerConfigBuilder {
    /// Set the target dialect
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.config.dialect = dialect;
        self
    }

    /// Set the year offset
    pub fn year_offset(mut self, years: i32) -> Self {
        self.config.year_offset = years;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    pub fn terminate_statements(mut self, terminate: bool) -> Self {
        self.config.terminate_statements = terminate;
        self
    }

    /// Build the configuration
    pub fn build(self) -> TranspilerConfig {
        self.config
    }
}
