//! Client configuration.
//!
//! Everything the client needs lives in [`ClientConfig`]; there are no
//! global defaults. The structs are plain serde types so an embedding
//! application can read them from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::endpoint::Endpoint;
use crate::error::MjpgError;
use crate::session::RetryPolicy;

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub stream: StreamConfig,
    pub control: ControlConfig,
    pub placeholder: PlaceholderConfig,
}

/// MJPEG stream location and recovery tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Server host, scheme included (`http://localhost`).
    pub host: String,
    pub port: u16,
    /// Stream path segment, e.g. `mjpg`.
    pub path: String,
    /// Failed reads tolerated before reopening; also open attempts.
    pub max_retry: u32,
    /// First back-off between open attempts.
    pub retry_delay_ms: u64,
    /// Back-off cap.
    pub max_retry_delay_ms: u64,
    /// Per-frame read timeout.
    pub read_timeout_ms: u64,
    /// Pause after a failed read.
    pub degraded_delay_ms: u64,
}

/// Control channel timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub connect_timeout_ms: u64,
    pub io_timeout_ms: u64,
}

/// "No connection" image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderConfig {
    /// Image file; a generated placeholder is used if it cannot be read.
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            control: ControlConfig::default(),
            placeholder: PlaceholderConfig::default(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 8080,
            path: "mjpg".into(),
            max_retry: 20,
            retry_delay_ms: 50,
            max_retry_delay_ms: 250,
            read_timeout_ms: 5000,
            degraded_delay_ms: 50,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 3000,
            io_timeout_ms: 5000,
        }
    }
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("noconnection.jpg"),
            width: None,
            height: None,
        }
    }
}

// ── Derived settings ─────────────────────────────────────────────

impl ClientConfig {
    /// Defaults pointed at `host:port/path`.
    pub fn for_endpoint(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        let mut cfg = Self::default();
        cfg.stream.host = host.into();
        cfg.stream.port = port;
        cfg.stream.path = path.into();
        cfg
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.stream.host.as_str(), self.stream.port, &self.stream.path)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retry: self.stream.max_retry,
            retry_delay: Duration::from_millis(self.stream.retry_delay_ms),
            max_retry_delay: Duration::from_millis(self.stream.max_retry_delay_ms),
            degraded_delay: Duration::from_millis(self.stream.degraded_delay_ms),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.stream.read_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.control.connect_timeout_ms)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.control.io_timeout_ms)
    }

    /// Configured placeholder size, if both dimensions are set.
    pub fn placeholder_size(&self) -> Option<(u32, u32)> {
        self.placeholder.width.zip(self.placeholder.height)
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ClientConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, MjpgError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn to_toml(&self) -> Result<String, MjpgError> {
        toml::to_string_pretty(self).map_err(|e| MjpgError::Config(e.to_string()))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.endpoint().address(), "http://localhost:8080/mjpg");
        assert_eq!(cfg.stream.max_retry, 20);
        assert_eq!(cfg.retry_policy().retry_delay, Duration::from_millis(50));
        assert_eq!(cfg.placeholder.path, PathBuf::from("noconnection.jpg"));
        assert_eq!(cfg.placeholder_size(), None);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = ClientConfig::from_toml(
            r#"
            [stream]
            host = "http://10.0.0.5"
            max_retry = 3

            [placeholder]
            width = 320
            height = 240
            "#,
        )
        .unwrap();
        assert_eq!(cfg.stream.host, "http://10.0.0.5");
        assert_eq!(cfg.stream.port, 8080);
        assert_eq!(cfg.stream.max_retry, 3);
        assert_eq!(cfg.control, ControlConfig::default());
        assert_eq!(cfg.placeholder_size(), Some((320, 240)));
    }

    #[test]
    fn half_a_size_is_no_size() {
        let cfg = ClientConfig::from_toml("[placeholder]\nwidth = 320\n").unwrap();
        assert_eq!(cfg.placeholder_size(), None);
    }

    #[test]
    fn roundtrip_config() {
        let cfg = ClientConfig::for_endpoint("http://cam", 81, "video");
        let text = cfg.to_toml().unwrap();
        assert!(text.contains("max_retry"));
        assert_eq!(ClientConfig::from_toml(&text).unwrap(), cfg);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = ClientConfig::from_toml("[stream\nport = ").unwrap_err();
        assert!(matches!(err, MjpgError::Config(_)));
    }

    #[test]
    fn missing_file_falls_back() {
        let cfg = ClientConfig::load(Path::new("/definitely/not/here.toml"));
        assert_eq!(cfg, ClientConfig::default());
    }
}
