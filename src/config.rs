//! Configuration management for shipbox
//!
//! Settings load from environment variables with typed defaults.
//!
//! # Environment Variables
//!
//! - `SHIPBOX_SERVER`: application server program - default: "gunicorn"
//! - `SHIPBOX_BASE_IMAGE`: base runtime image - default: "python:3.11-slim"
//! - `SHIPBOX_MANIFEST`: dependency manifest file - default: "requirements.txt"
//! - `SHIPBOX_BUILD_TOOL`: container build binary - default: "docker"
//! - `SHIPBOX_LOG_LEVEL`: logging level - default: "info"
//!
//! `PORT` is deliberately not here: it is container-start state, read by the
//! launcher, not tool configuration.

use std::env;
use thiserror::Error;

const DEFAULT_SERVER: &str = "gunicorn";
const DEFAULT_BASE_IMAGE: &str = "python:3.11-slim";
const DEFAULT_MANIFEST: &str = "requirements.txt";
const DEFAULT_BUILD_TOOL: &str = "docker";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Main configuration structure for shipbox
///
/// Constructed via `Default::default()`, which reads SHIPBOX_* environment
/// variables and falls back to the defaults above.
#[derive(Debug, Clone)]
pub struct ShipboxConfig {
    /// Application server program invoked by the launcher and in CMD
    pub server_program: String,

    /// Base runtime image for generated plans
    pub base_image: String,

    /// Dependency manifest file name
    pub manifest: String,

    /// Container build binary driven by the docker backend
    pub build_tool: String,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ShipboxConfig {
    fn default() -> Self {
        Self {
            server_program: env_or("SHIPBOX_SERVER", DEFAULT_SERVER),
            base_image: env_or("SHIPBOX_BASE_IMAGE", DEFAULT_BASE_IMAGE),
            manifest: env_or("SHIPBOX_MANIFEST", DEFAULT_MANIFEST),
            build_tool: env_or("SHIPBOX_BUILD_TOOL", DEFAULT_BUILD_TOOL),
            log_level: env_or("SHIPBOX_LOG_LEVEL", DEFAULT_LOG_LEVEL),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

impl ShipboxConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_program.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "server program cannot be empty".to_string(),
            ));
        }
        if self.base_image.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "base image cannot be empty".to_string(),
            ));
        }
        if self.manifest.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "manifest cannot be empty".to_string(),
            ));
        }
        if self.build_tool.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "build tool cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        env::remove_var("SHIPBOX_SERVER");
        env::remove_var("SHIPBOX_BASE_IMAGE");
        env::remove_var("SHIPBOX_MANIFEST");
        env::remove_var("SHIPBOX_BUILD_TOOL");

        let config = ShipboxConfig::default();
        assert_eq!(config.server_program, "gunicorn");
        assert_eq!(config.base_image, "python:3.11-slim");
        assert_eq!(config.manifest, "requirements.txt");
        assert_eq!(config.build_tool, "docker");
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        env::set_var("SHIPBOX_SERVER", "uvicorn");
        env::set_var("SHIPBOX_MANIFEST", "requirements-prod.txt");

        let config = ShipboxConfig::default();
        assert_eq!(config.server_program, "uvicorn");
        assert_eq!(config.manifest, "requirements-prod.txt");

        env::remove_var("SHIPBOX_SERVER");
        env::remove_var("SHIPBOX_MANIFEST");
    }

    #[test]
    #[serial]
    fn test_empty_env_falls_back() {
        env::set_var("SHIPBOX_SERVER", "");
        let config = ShipboxConfig::default();
        assert_eq!(config.server_program, "gunicorn");
        env::remove_var("SHIPBOX_SERVER");
    }

    #[test]
    fn test_validation_rejects_empty_fields() {
        let mut config = ShipboxConfig::default();
        config.server_program = String::new();
        assert!(config.validate().is_err());
    }
}
