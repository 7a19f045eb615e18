//! Integration tests for the cfnforge configuration system
//!
//! These tests verify:
//! - Default values for all configuration sections
//! - Loading configuration from TOML files
//! - Environment variable overrides
//! - Validation and error reporting

use cfnforge::config::{Config, LoggingConfig, OutputConfig};
use cfnforge::error::Error;
use cfnforge::template::JsonStyle;
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

// ============================================================================
// Default Configuration Tests
// ============================================================================

#[test]
fn test_default_config_values() {
    let config = Config::default();
    assert_eq!(config.logging, LoggingConfig { log_level: "warn".to_string() });
    assert_eq!(config.output, OutputConfig { pretty: true, indent: 4 });
}

#[test]
fn test_empty_file_gives_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfnforge.toml");
    fs::write(&path, "").unwrap();
    assert_eq!(Config::from_file(&path).unwrap(), Config::default());
}

// ============================================================================
// File Loading Tests
// ============================================================================

#[test]
#[serial]
fn test_load_explicit_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(
        &path,
        r#"
[logging]
log_level = "debug"

[output]
pretty = true
indent = 2
"#,
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.logging.log_level, "debug");
    assert_eq!(config.json_style(), JsonStyle::Pretty { indent: 2 });
}

#[test]
fn test_missing_explicit_path_fails() {
    let path = PathBuf::from("/nonexistent/cfnforge.toml");
    let err = Config::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_parse_error_carries_config_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[output]\nindent = \"wide\"\n").unwrap();

    let err = Config::from_file(&path).unwrap_err();
    let cause = err
        .chain()
        .find_map(|c| c.downcast_ref::<Error>())
        .expect("parse failure should wrap a cfnforge error");
    assert_eq!(cause.exit_code(), 5);
}

#[test]
fn test_unknown_keys_ignored() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("extra.toml");
    fs::write(&path, "[output]\npretty = false\n\n[future]\nflag = true\n").unwrap();
    assert_eq!(Config::from_file(&path).unwrap().json_style(), JsonStyle::Compact);
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
#[serial]
fn test_indent_limit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wide.toml");
    fs::write(&path, "[output]\nindent = 40\n").unwrap();

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("output.indent"));
}

// ============================================================================
// Environment Override Tests
// ============================================================================

#[test]
#[serial]
fn test_env_log_level_override() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("quiet.toml");
    fs::write(&path, "[logging]\nlog_level = \"error\"\n").unwrap();

    std::env::set_var("CFNFORGE_LOG_LEVEL", "Trace");
    let config = Config::load(Some(&path));
    std::env::remove_var("CFNFORGE_LOG_LEVEL");

    assert_eq!(config.unwrap().logging.log_level, "trace");
}

#[test]
#[serial]
fn test_env_invalid_level_rejected() {
    std::env::set_var("CFNFORGE_LOG_LEVEL", "shout");
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.toml");
    fs::write(&path, "").unwrap();
    let result = Config::load(Some(&path));
    std::env::remove_var("CFNFORGE_LOG_LEVEL");

    assert!(result.is_err());
}
