//! Configuration management for the file server.
//!
//! This module provides TOML-based configuration file loading.
//! The default configuration path is `~/.config/file-server/config.toml`.
//! Values are layered: defaults, then the file, then environment variables,
//! then command-line flags (applied by the binary).

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::files::DEFAULT_CHUNK_SIZE;

/// Smallest accepted download chunk size (1KB).
pub const MIN_CHUNK_SIZE: usize = 1024;

/// Largest accepted download chunk size (16MB).
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("host must be an IP address, got {0}")]
    InvalidHost(String),

    #[error("port must be between 1 and 65535, got {0}")]
    InvalidPort(u16),

    #[error("chunk_size must be between {MIN_CHUNK_SIZE} and {MAX_CHUNK_SIZE} bytes, got {0}")]
    InvalidChunkSize(usize),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Environment variable overriding `server.host`.
pub const ENV_HOST: &str = "FILE_SERVER_HOST";

/// Environment variable overriding `server.port`.
pub const ENV_PORT: &str = "FILE_SERVER_PORT";

/// Environment variable overriding `logging.level`.
pub const ENV_LOG_LEVEL: &str = "FILE_SERVER_LOG_LEVEL";

/// Outcome of one environment variable in [`Config::apply_env_overrides`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvOverride {
    /// The variable replaced the configured value.
    Applied { var: &'static str, value: String },
    /// The variable was set but could not be used.
    Ignored {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl EnvOverride {
    /// Write this override to the log.
    pub fn log(&self) {
        match self {
            EnvOverride::Applied { var, value } => {
                tracing::info!("Overriding from {}: {}", var, value);
            }
            EnvOverride::Ignored { var, value, reason } => {
                tracing::warn!("Ignoring invalid {} {:?}: {}", var, value, reason);
            }
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the file server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Listener configuration.
    pub server: ServerConfig,

    /// Download configuration.
    pub transfer: TransferConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to.
    pub host: String,

    /// Port to listen on.
    pub port: u16,
}

/// Download configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransferConfig {
    /// Chunk size for streamed file downloads in bytes (default: 64KB).
    pub chunk_size: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub level: String,

    /// Optional log file written in addition to stdout.
    pub file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("file-server")
        .join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - FILE_SERVER_HOST: Override bind address
    /// - FILE_SERVER_PORT: Override listen port
    /// - FILE_SERVER_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    ///
    /// This runs before logging is set up, so nothing is logged here. The
    /// returned report is meant to be logged once a subscriber exists.
    pub fn apply_env_overrides(&mut self) -> Vec<EnvOverride> {
        let mut report = Vec::new();

        if let Some(host) = non_empty_var(ENV_HOST) {
            self.server.host = host.clone();
            report.push(EnvOverride::Applied {
                var: ENV_HOST,
                value: host,
            });
        }

        if let Some(port) = non_empty_var(ENV_PORT) {
            match port.parse::<u16>() {
                Ok(parsed) => {
                    self.server.port = parsed;
                    report.push(EnvOverride::Applied {
                        var: ENV_PORT,
                        value: port,
                    });
                }
                Err(e) => report.push(EnvOverride::Ignored {
                    var: ENV_PORT,
                    value: port,
                    reason: e.to_string(),
                }),
            }
        }

        if let Some(level) = non_empty_var(ENV_LOG_LEVEL) {
            self.logging.level = level.clone();
            report.push(EnvOverride::Applied {
                var: ENV_LOG_LEVEL,
                value: level,
            });
        }

        report
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .host
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort(self.server.port));
        }

        let chunk_size = self.transfer.chunk_size;
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk_size) {
            return Err(ConfigError::InvalidChunkSize(chunk_size));
        }

        let level = self.logging.level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.level.clone()));
        }

        Ok(())
    }

    /// The socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self
            .server
            .host
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.transfer.chunk_size, 64 * 1024);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_from_toml_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[server]
port = 9000

[logging]
level = "debug"
file = "/var/log/file-server.log"
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.file,
            Some(PathBuf::from("/var/log/file-server.log"))
        );
        assert_eq!(config.transfer.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_to_toml_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.server.port = 25565;
        config.transfer.chunk_size = 128 * 1024;
        config.logging.file = Some(PathBuf::from("/var/log/file-server.log"));
        fs::write(&config_path, config.to_toml().unwrap()).unwrap();

        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        fs::write(&config_path, "invalid [ toml").unwrap();

        let result = Config::load(&config_path);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_helpful_error_messages() {
        let toml = r#"
[server]
port = "not a number"
"#;
        let err = Config::from_toml(toml).unwrap_err().to_string();
        assert!(err.contains("Invalid TOML"));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("file-server"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_validate_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_host() {
        let mut config = Config::default();
        config.server.host = "localhost".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidHost("localhost".to_string()))
        );
    }

    #[test]
    fn test_validate_ipv6_host() {
        let mut config = Config::default();
        config.server.host = "::1".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr().unwrap().to_string(), "[::1]:8080");
    }

    #[test]
    fn test_validate_port_zero() {
        let mut config = Config::default();
        config.server.port = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidPort(0)));
    }

    #[test]
    fn test_validate_chunk_size_bounds() {
        let mut config = Config::default();

        config.transfer.chunk_size = MIN_CHUNK_SIZE - 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidChunkSize(_))
        ));

        config.transfer.chunk_size = MIN_CHUNK_SIZE;
        assert!(config.validate().is_ok());

        config.transfer.chunk_size = MAX_CHUNK_SIZE;
        assert!(config.validate().is_ok());

        config.transfer.chunk_size = MAX_CHUNK_SIZE + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidChunkSize(_))
        ));
    }

    #[test]
    fn test_validate_log_level_case_insensitive() {
        let mut config = Config::default();
        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_log_level_invalid() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("verbose".to_string()))
        );
    }

    #[test]
    fn test_bind_addr() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 20205;
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:20205");
    }

    #[test]
    #[serial]
    fn test_env_override_port_and_host() {
        std::env::set_var("FILE_SERVER_HOST", "127.0.0.1");
        std::env::set_var("FILE_SERVER_PORT", "9090");

        let mut config = Config::default();
        let report = config.apply_env_overrides();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(
            report,
            vec![
                EnvOverride::Applied {
                    var: ENV_HOST,
                    value: "127.0.0.1".to_string()
                },
                EnvOverride::Applied {
                    var: ENV_PORT,
                    value: "9090".to_string()
                },
            ]
        );

        std::env::remove_var("FILE_SERVER_HOST");
        std::env::remove_var("FILE_SERVER_PORT");
    }

    #[test]
    #[serial]
    fn test_env_override_invalid_port_ignored() {
        std::env::set_var("FILE_SERVER_PORT", "eighty");

        let mut config = Config::default();
        let report = config.apply_env_overrides();
        assert_eq!(config.server.port, 8080);
        assert!(matches!(
            report.as_slice(),
            [EnvOverride::Ignored { var: ENV_PORT, value, .. }] if value == "eighty"
        ));

        std::env::remove_var("FILE_SERVER_PORT");
    }

    #[test]
    #[serial]
    fn test_env_override_empty_does_not_override() {
        std::env::set_var("FILE_SERVER_LOG_LEVEL", "");

        let mut config = Config::default();
        let report = config.apply_env_overrides();
        assert_eq!(config.logging.level, "info");
        assert!(report.is_empty());

        std::env::remove_var("FILE_SERVER_LOG_LEVEL");
    }

    #[test]
    #[serial]
    fn test_env_override_log_level() {
        std::env::set_var("FILE_SERVER_LOG_LEVEL", "trace");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.logging.level, "trace");

        std::env::remove_var("FILE_SERVER_LOG_LEVEL");
    }
}
