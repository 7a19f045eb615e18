//! Configuration module for cfnforge
//!
//! Handles loading configuration from multiple sources:
//! - Default values
//! - Explicit path (`--config` or `CFNFORGE_CONFIG`)
//! - Project configuration (`./cfnforge.toml`)
//! - Environment variables
//!
//! Configuration never changes the content of the generated document, only
//! how it is logged and formatted.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::template::JsonStyle;

/// File looked up in the working directory when no path is given.
pub const PROJECT_CONFIG: &str = "cfnforge.toml";

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];
const MAX_INDENT: usize = 16;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings
    pub logging: LoggingConfig,

    /// Document formatting settings
    pub output: OutputConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when no `-v` flag is given
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Indent the document
    pub pretty: bool,

    /// Spaces per level when pretty
    pub indent: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: 4,
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = match Self::get_config_path(config_path) {
            Some(path) => Self::from_file(&path)?,
            None => Config::default(),
        };

        // Apply environment variable overrides
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// The file to read, if any
    fn get_config_path(explicit_path: Option<&PathBuf>) -> Option<PathBuf> {
        // Explicit path takes priority and must exist
        if let Some(path) = explicit_path {
            return Some(path.clone());
        }

        let project = PathBuf::from(PROJECT_CONFIG);
        project.exists().then_some(project)
    }

    /// Load from a specific file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .map_err(Error::from)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // CFNFORGE_LOG_LEVEL
        if let Ok(level) = std::env::var("CFNFORGE_LOG_LEVEL") {
            self.logging.log_level = level.to_lowercase();
        }
    }

    /// Check values the type system cannot
    pub fn validate(&self) -> std::result::Result<(), Error> {
        if !LOG_LEVELS.contains(&self.logging.log_level.as_str()) {
            return Err(Error::InvalidConfig {
                key: "logging.log_level".to_string(),
                message: format!(
                    "'{}' is not one of {}",
                    self.logging.log_level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        if self.output.indent > MAX_INDENT {
            return Err(Error::InvalidConfig {
                key: "output.indent".to_string(),
                message: format!("{} exceeds the maximum of {}", self.output.indent, MAX_INDENT),
            });
        }
        Ok(())
    }

    /// How the document is rendered
    pub fn json_style(&self) -> JsonStyle {
        if self.output.pretty {
            JsonStyle::Pretty {
                indent: self.output.indent,
            }
        } else {
            JsonStyle::Compact
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.log_level, "warn");
        assert!(config.output.pretty);
        assert_eq!(config.json_style(), JsonStyle::Pretty { indent: 4 });
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str("[output]\npretty = false\n").unwrap();
        assert_eq!(config.output.indent, 4);
        assert_eq!(config.json_style(), JsonStyle::Compact);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_invalid_level_rejected() {
        let config = Config {
            logging: LoggingConfig {
                log_level: "loud".to_string(),
            },
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("CFNFORGE_LOG_LEVEL", "DEBUG");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.logging.log_level, "debug");
        std::env::remove_var("CFNFORGE_LOG_LEVEL");
    }
}
