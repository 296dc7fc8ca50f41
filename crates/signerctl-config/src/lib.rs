#![deny(unsafe_code)]

//! Configuration loading and validation for signerctl.
//!
//! Loads TOML configuration files and validates them. [`ClientConfig`] is the
//! central configuration structure; it tells the client where the signer
//! engine's control socket lives and which binary to launch when the engine
//! has to be started.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Longest socket path accepted, excluding the terminating NUL of `sun_path`.
#[cfg(target_os = "linux")]
pub const MAX_SOCKET_PATH_LEN: usize = 107;
#[cfg(not(target_os = "linux"))]
pub const MAX_SOCKET_PATH_LEN: usize = 103;

/// Default control socket of the signer engine.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/opendnssec/engine.sock";

/// Default signer engine binary, resolved through `PATH`.
pub const DEFAULT_ENGINE_BINARY: &str = "ods-signerd";

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level client configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Signer engine connection settings.
    #[serde(default)]
    pub signer: SignerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the signer engine listens and how to start it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    /// Filesystem path of the engine's Unix control socket.
    #[serde(default = "default_socket_path")]
    pub socket_path: String,

    /// Engine binary spawned by the `start` command when the socket is
    /// not reachable.
    #[serde(default = "default_engine_binary")]
    pub engine_binary: String,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            engine_binary: default_engine_binary(),
        }
    }
}

fn default_socket_path() -> String {
    DEFAULT_SOCKET_PATH.to_string()
}

fn default_engine_binary() -> String {
    DEFAULT_ENGINE_BINARY.to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "warn", "info", "debug").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// stderr is shared with the interactive prompt, keep it quiet by default
fn default_log_level() -> String {
    "warn".to_string()
}

impl ClientConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signer.socket_path.is_empty() {
            return Err(ConfigError::Validation(
                "signer.socket_path must not be empty".to_string(),
            ));
        }
        if self.signer.socket_path.len() > MAX_SOCKET_PATH_LEN {
            return Err(ConfigError::Validation(format!(
                "signer.socket_path is {} bytes, the limit is {MAX_SOCKET_PATH_LEN}",
                self.signer.socket_path.len()
            )));
        }
        if self.signer.engine_binary.is_empty() {
            return Err(ConfigError::Validation(
                "signer.engine_binary must not be empty".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.signer.socket_path, DEFAULT_SOCKET_PATH);
        assert_eq!(config.signer.engine_binary, DEFAULT_ENGINE_BINARY);
        assert_eq!(config.logging.level, "warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = ClientConfig::parse("").unwrap();
        assert_eq!(config.signer.socket_path, DEFAULT_SOCKET_PATH);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            [signer]
            socket_path = "/tmp/engine.sock"
            engine_binary = "/usr/local/sbin/ods-signerd"

            [logging]
            level = "debug"
        "#;
        let config = ClientConfig::parse(toml).unwrap();
        assert_eq!(config.signer.socket_path, "/tmp/engine.sock");
        assert_eq!(config.signer.engine_binary, "/usr/local/sbin/ods-signerd");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validation_rejects_empty_socket_path() {
        let toml = r#"
            [signer]
            socket_path = ""
        "#;
        assert!(ClientConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_long_socket_path() {
        let long = format!("/tmp/{}", "s".repeat(MAX_SOCKET_PATH_LEN));
        let toml = format!("[signer]\nsocket_path = \"{long}\"\n");
        let err = ClientConfig::parse(&toml).unwrap_err();
        assert!(err.to_string().contains("signer.socket_path"));
    }

    #[test]
    fn test_validation_accepts_socket_path_at_limit() {
        let path = format!("/{}", "s".repeat(MAX_SOCKET_PATH_LEN - 1));
        let toml = format!("[signer]\nsocket_path = \"{path}\"\n");
        assert!(ClientConfig::parse(&toml).is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_engine_binary() {
        let toml = r#"
            [signer]
            engine_binary = ""
        "#;
        assert!(ClientConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_log_level() {
        let toml = r#"
            [logging]
            level = "loud"
        "#;
        assert!(ClientConfig::parse(toml).is_err());
    }

    #[test]
    fn test_unknown_section_is_ignored() {
        let toml = r#"
            [enforcer]
            socket_path = "/tmp/enforcer.sock"
        "#;
        let config = ClientConfig::parse(toml).unwrap();
        assert_eq!(config.signer.socket_path, DEFAULT_SOCKET_PATH);
    }

    // ── Async file-based loading ──────────────────────────────────────

    #[test_log::test(tokio::test)]
    async fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("signerctl.toml");
        tokio::fs::write(&path, b"[signer]\nsocket_path = \"/tmp/x.sock\"\n")
            .await
            .unwrap();

        let config = ClientConfig::load(&path).await.unwrap();
        assert_eq!(config.signer.socket_path, "/tmp/x.sock");
    }

    #[tokio::test]
    async fn test_load_nonexistent_file() {
        let result = ClientConfig::load(Path::new("/nonexistent/signerctl.toml")).await;
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[tokio::test]
    async fn test_load_invalid_toml_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        tokio::fs::write(&path, b"not valid toml [[[").await.unwrap();

        let result = ClientConfig::load(&path).await;
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("bad value".to_string());
        assert_eq!(err.to_string(), "validation error: bad value");
    }
}
