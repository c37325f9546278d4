//! Configuration types for Mirage.

mod listen;

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub use listen::{ListenConfig, MetricsConfig};

use crate::emulator::{DEFAULT_HISTORY_CAPACITY, URI_OVERRIDE_HEADER};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub presets: PresetsConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    /// Header whose value replaces the path and query of application requests
    #[serde(default = "default_uri_override_header")]
    pub uri_override_header: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            metrics: MetricsConfig::default(),
            presets: PresetsConfig::default(),
            history: HistoryConfig::default(),
            uri_override_header: default_uri_override_header(),
        }
    }
}

/// Preset response rules loaded at startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PresetsConfig {
    /// Directory searched recursively for `*.json` rule documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HistoryConfig {
    /// Requests kept per request type
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
        }
    }
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_uri_override_header() -> String {
    URI_OVERRIDE_HEADER.to_string()
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Address of the monitoring listener, on the same host as the main one
    pub fn metrics_addr(&self) -> Result<std::net::SocketAddr, anyhow::Error> {
        let mut addr = self.listen.socket_addr()?;
        addr.set_port(self.metrics.port);
        Ok(addr)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.listen.socket_addr()?;

        if self.metrics.port != 0 && self.metrics.port == self.listen.port {
            anyhow::bail!(
                "metrics.port {} must differ from listen.port",
                self.metrics.port
            );
        }

        if self.history.capacity == 0 {
            anyhow::bail!("history.capacity must be at least 1");
        }

        if self.uri_override_header.is_empty()
            || hyper::header::HeaderName::from_bytes(self.uri_override_header.as_bytes()).is_err()
        {
            anyhow::bail!(
                "uri_override_header '{}' is not a valid HTTP header name",
                self.uri_override_header
            );
        }

        if let Some(ref dir) = self.presets.directory {
            if !dir.is_dir() {
                anyhow::bail!(
                    "presets.directory '{}' does not exist or is not a directory",
                    dir.display()
                );
            }
        }

        Ok(())
    }
}
