//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`ClientConfig`] values, or
//! write them to a temporary TOML file for code that loads from disk.

use std::path::{Path, PathBuf};

use signerctl_config::ClientConfig;
use tempfile::TempDir;

/// Fluent builder for [`ClientConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .socket_path(engine.socket_path())
///     .engine_binary("true")
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: ClientConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn socket_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.signer.socket_path = path.as_ref().display().to_string();
        self
    }

    pub fn engine_binary(mut self, binary: &str) -> Self {
        self.config.signer.engine_binary = binary.to_string();
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }

    /// Serialize the config into `signerctl.toml` inside `dir`.
    pub fn write_to(self, dir: &TempDir) -> PathBuf {
        let path = dir.path().join("signerctl.toml");
        let content = toml::to_string(&self.config).expect("failed to serialize test config");
        std::fs::write(&path, content).expect("failed to write test config");
        path
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
