//! # mjpg-core
//!
//! Pull client for MJPEG-over-HTTP video feeds with a control channel
//! for the streaming server.
//!
//! This crate contains:
//! - **Client**: `MjpgClient`, the facade that always returns a frame
//! - **Session**: `StreamSession` and its `SessionPhase` state machine
//! - **Capture**: the `Capture` seam, `JpegCodec` demuxer and `HttpMjpegCapture`
//! - **Control**: `ControlClient` for the server's fps/quality/resolution/connections
//! - **HTTP**: the one-request-per-connection exchange both of the above use
//! - **Frames**: `Frame`, `FrameCache` and the `FpsTracker`
//! - **Config**: `ClientConfig`, serde/TOML
//! - **Error**: `MjpgError`, `thiserror`-based

pub mod cache;
pub mod capture;
pub mod client;
pub mod config;
pub mod control;
pub mod endpoint;
pub mod error;
pub mod fps;
pub mod frame;
pub mod http;
pub mod session;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use cache::FrameCache;
pub use capture::{Capture, HttpMjpegCapture, JpegCodec, MjpegHandle};
pub use client::{MjpgClient, PullStats};
pub use config::{ClientConfig, ControlConfig, PlaceholderConfig, StreamConfig};
pub use control::{ControlClient, atoi, parse_resolution};
pub use endpoint::Endpoint;
pub use error::MjpgError;
pub use fps::FpsTracker;
pub use frame::Frame;
pub use http::{HttpExchange, HttpMethod, HttpRequest, HttpResponse};
pub use session::{RetryPolicy, SessionPhase, StreamSession};
