//! Viewer configuration.

use std::path::{Path, PathBuf};

use mjpg_core::{ClientConfig, Endpoint, MjpgError};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Stream, control and placeholder settings.
    pub client: ClientConfig,
    /// What the viewer does with the stream.
    pub viewer: ViewerSettings,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Pull-loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// JPEG quality pushed to the server on start; `-1` leaves it alone.
    pub quality: i32,
    /// Target fps pushed to the server on start; `-1` leaves it alone.
    pub fps: i32,
    /// Report the local fps every this many frames.
    pub print_every: u64,
    /// Stop after this many frames; 0 runs until interrupted.
    pub max_frames: u64,
    /// Write the latest frame here on every report. Empty disables.
    pub snapshot: PathBuf,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level, overridden by `RUST_LOG`.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            viewer: ViewerSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            quality: 1,
            fps: 35,
            print_every: 20,
            max_frames: 0,
            snapshot: PathBuf::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ViewerConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Point the client at a stream URL such as `http://cam:8080/mjpg`.
    pub fn apply_url(&mut self, url: &str) -> Result<(), MjpgError> {
        let endpoint = Endpoint::parse(url)?;
        self.client.stream.host = endpoint.host().to_string();
        self.client.stream.port = endpoint.port();
        if !endpoint.path().is_empty() {
            self.client.stream.path = endpoint.path().to_string();
        }
        Ok(())
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        let path = self.viewer.snapshot.as_path();
        (!path.as_os_str().is_empty()).then_some(path)
    }
}

// ── Tests ────────────────────────────────────────────────────────
