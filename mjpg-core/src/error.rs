//! Domain-specific error types for the MJPEG client.
//!
//! Internal operations return `Result<T, MjpgError>`. The public
//! [`MjpgClient`](crate::MjpgClient) surface never hands these to the
//! caller: they are logged and turned into fallback frames or sentinel
//! values at the component boundary.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the MJPEG client.
#[derive(Debug, Error)]
pub enum MjpgError {
    // ── Addressing ───────────────────────────────────────────────
    /// The endpoint string could not be turned into a usable address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    // ── Connection Errors ────────────────────────────────────────
    /// The capture could not be opened within the retry budget.
    #[error("failed to open {address} after {attempts} attempts")]
    ConnectFailed { address: String, attempts: u32 },

    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// The peer closed the stream before a complete frame arrived.
    #[error("stream closed by peer")]
    StreamClosed,

    // ── HTTP Errors ──────────────────────────────────────────────
    /// The response did not start with a parsable `HTTP/x.y <code>` line.
    #[error("invalid HTTP status line")]
    InvalidStatusLine,

    /// The server answered with a status other than 200.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The response head or body grew past its byte limit.
    #[error("HTTP response exceeds {limit} bytes")]
    ResponseTooLarge { limit: usize },

    // ── Frame Errors ─────────────────────────────────────────────
    /// A frame grew past the demuxer's buffer limit without ending.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The capture produced a frame with no pixels.
    #[error("empty frame")]
    EmptyFrame,

    /// A requested frame size is zero or too large to allocate.
    #[error("invalid frame size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    /// JPEG decoding, encoding or file loading failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    // ── State Errors ─────────────────────────────────────────────
    /// A session phase transition was requested from the wrong phase.
    #[error("invalid session transition: {0}")]
    InvalidTransition(&'static str),

    // ── Configuration ────────────────────────────────────────────
    /// A configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl MjpgError {
    /// Whether this error comes from the network rather than from the
    /// data the peer sent.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout(_) | Self::StreamClosed | Self::ConnectFailed { .. }
        )
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<toml::de::Error> for MjpgError {
    fn from(e: toml::de::Error) -> Self {
        MjpgError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = MjpgError::ConnectFailed {
            address: "http://localhost:8080/mjpg".into(),
            attempts: 21,
        };
        assert!(e.to_string().contains("localhost:8080/mjpg"));
        assert!(e.to_string().contains("21"));

        let e = MjpgError::Status(404);
        assert!(e.to_string().contains("404"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let e: MjpgError = io_err.into();
        assert!(matches!(e, MjpgError::Connection(_)));
        assert!(e.is_transport());
    }

    #[test]
    fn protocol_errors_are_not_transport() {
        assert!(!MjpgError::InvalidStatusLine.is_transport());
        assert!(!MjpgError::EmptyFrame.is_transport());
        assert!(!MjpgError::ResponseTooLarge { limit: 1 }.is_transport());
    }
}
