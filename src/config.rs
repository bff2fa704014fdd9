//! Client configuration.
//!
//! A [`ClientConfig`] names the planning service endpoint, the channel
//! security mode and the default per-call deadlines. It can be built in
//! code or loaded from a JSON file:
//!
//! ```json
//! {
//!   "endpoint": "planner.local:5050",
//!   "security": "insecure",
//!   "submit_deadline_ms": 10000
//! }
//! ```
//!
//! `security` has no default. Plain TCP must be chosen explicitly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the planning service address.
pub const ENDPOINT_ENV: &str = "MOTION_PLANNER_ADDR";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "MOTION_PLANNER_CONFIG";

/// Address used when neither the config nor the environment names one.
pub const DEFAULT_ENDPOINT: &str = "localhost:5050";

const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_SUBMIT_DEADLINE_MS: u64 = 30_000;

/// Transport security of the channel to the planning service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSecurity {
    /// Plain TCP. Traffic, including plan ids, is readable on the network.
    Insecure,
    /// Encrypted transport. Not available in this build; calls fail with
    /// `TransportError::UnsupportedSecurity`.
    Tls,
}

impl std::fmt::Display for ChannelSecurity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelSecurity::Insecure => write!(f, "insecure"),
            ChannelSecurity::Tls => write!(f, "tls"),
        }
    }
}

/// Errors while loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Connection settings for a [`crate::client::PlannerClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// `host:port` of the planning service.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    pub security: ChannelSecurity,

    /// Time allowed for opening the TCP connection.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Default deadline for start requests. `None` waits indefinitely.
    #[serde(default = "default_submit_deadline_ms")]
    pub submit_deadline_ms: Option<u64>,

    /// Default deadline for retrieve requests. `None` lets a blocking
    /// retrieve wait until the server answers.
    #[serde(default)]
    pub retrieve_deadline_ms: Option<u64>,
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_submit_deadline_ms() -> Option<u64> {
    Some(DEFAULT_SUBMIT_DEADLINE_MS)
}

/// Resolve the planning service address.
///
/// Resolution order:
/// 1. `$MOTION_PLANNER_ADDR`
/// 2. `localhost:5050`
pub fn default_endpoint() -> String {
    std::env::var(ENDPOINT_ENV).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string())
}

/// Resolve the default config file location.
///
/// Resolution order:
/// 1. `$MOTION_PLANNER_CONFIG`
/// 2. `<config dir>/motion-planner/client.json` (XDG on Linux, Library on macOS)
/// 3. `./motion-planner-client.json`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("motion-planner").join("client.json");
    }

    PathBuf::from("motion-planner-client.json")
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, security: ChannelSecurity) -> Self {
        Self {
            endpoint: endpoint.into(),
            security,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            submit_deadline_ms: Some(DEFAULT_SUBMIT_DEADLINE_MS),
            retrieve_deadline_ms: None,
        }
    }

    /// Plain TCP to `endpoint`.
    pub fn insecure(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint, ChannelSecurity::Insecure)
    }

    /// Load a config from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn submit_deadline(&self) -> Option<Duration> {
        self.submit_deadline_ms.map(Duration::from_millis)
    }

    pub fn retrieve_deadline(&self) -> Option<Duration> {
        self.retrieve_deadline_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn test_load_applies_defaults() {
        let file = write_config(r#"{"endpoint": "planner:6000", "security": "insecure"}"#);
        let config = ClientConfig::load(file.path()).unwrap();

        assert_eq!(config, ClientConfig::insecure("planner:6000"));
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.submit_deadline(), Some(Duration::from_secs(30)));
        assert_eq!(config.retrieve_deadline(), None);
    }

    #[test]
    fn test_load_reads_explicit_deadlines() {
        let file = write_config(
            r#"{
                "endpoint": "planner:6000",
                "security": "tls",
                "connect_timeout_ms": 250,
                "submit_deadline_ms": null,
                "retrieve_deadline_ms": 1500
            }"#,
        );
        let config = ClientConfig::load(file.path()).unwrap();

        assert_eq!(config.security, ChannelSecurity::Tls);
        assert_eq!(config.connect_timeout(), Duration::from_millis(250));
        assert_eq!(config.submit_deadline(), None);
        assert_eq!(config.retrieve_deadline(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_security_must_be_explicit() {
        let file = write_config(r#"{"endpoint": "planner:6000"}"#);
        let err = ClientConfig::load(file.path()).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("security"), "got: {}", err);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_default_config_path_format() {
        let path = default_config_path();
        let filename = path.file_name().unwrap().to_str().unwrap();
        assert!(
            filename.ends_with(".json"),
            "Unexpected config filename: {}",
            filename
        );
    }
}
