//! REST control channel of the streaming server.
//!
//! Every call opens its own short-lived connection, so control traffic
//! never touches the stream session. Getters return `0` (or `(0, 0)`)
//! when anything goes wrong; setters return `false`.

use std::time::Duration;

use tracing::{debug, warn};

use crate::endpoint::Endpoint;
use crate::http::{HttpExchange, HttpRequest, HttpResponse};

const FPS: &str = "fps";
const QUALITY: &str = "quality";
const RESOLUTION: &str = "resolution";
const CONNECTIONS: &str = "connections";

/// Client for the `fps`, `quality`, `resolution` and `connections`
/// resources of the server.
#[derive(Debug, Clone)]
pub struct ControlClient {
    exchange: HttpExchange,
}

impl ControlClient {
    pub fn new(endpoint: Endpoint, connect_timeout: Duration, io_timeout: Duration) -> Self {
        Self {
            exchange: HttpExchange::new(endpoint, connect_timeout, io_timeout),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.exchange.endpoint()
    }

    // ── fps ──────────────────────────────────────────────────────

    /// Frame rate the server is producing.
    pub async fn server_fps(&self) -> i32 {
        self.get_int(FPS).await
    }

    /// Set the server target frame rate. `-1` disables regulation.
    pub async fn set_server_fps(&self, fps: i32) -> bool {
        self.post(FPS, fps.to_string()).await
    }

    // ── quality ──────────────────────────────────────────────────

    /// JPEG quality (0-100) the server encodes with.
    pub async fn server_quality(&self) -> i32 {
        self.get_int(QUALITY).await
    }

    /// Set the server JPEG quality. `-1` leaves it unregulated.
    pub async fn set_server_quality(&self, quality: i32) -> bool {
        self.post(QUALITY, quality.to_string()).await
    }

    // ── resolution ───────────────────────────────────────────────

    /// Output resolution of the server, `(0, 0)` on failure.
    pub async fn server_resolution(&self) -> (i32, i32) {
        match self.get(RESOLUTION).await {
            Some(body) => parse_resolution(&body),
            None => (0, 0),
        }
    }

    pub async fn set_server_resolution(&self, width: i32, height: i32) -> bool {
        self.post(RESOLUTION, format!("{width}x{height}")).await
    }

    // ── connections ──────────────────────────────────────────────

    /// Number of clients currently connected to the server.
    pub async fn server_connections(&self) -> i32 {
        self.get_int(CONNECTIONS).await
    }

    /// Set the maximum number of concurrent stream clients.
    pub async fn set_server_connections(&self, connections: i32) -> bool {
        self.post(CONNECTIONS, connections.to_string()).await
    }

    // ── Plumbing ─────────────────────────────────────────────────

    async fn get(&self, resource: &str) -> Option<String> {
        let response = self
            .exchange
            .send(&HttpRequest::get(Endpoint::request_path(resource)))
            .await;
        Self::body_of(resource, response)
    }

    async fn get_int(&self, resource: &str) -> i32 {
        self.get(resource).await.map_or(0, |body| atoi(&body))
    }

    async fn post(&self, resource: &str, body: String) -> bool {
        debug!("POST /{resource} {body}");
        let response = self
            .exchange
            .send(&HttpRequest::post(Endpoint::request_path(resource), body))
            .await;
        if !response.is_success() {
            warn!("failed setting server {resource} (status {})", response.status);
            return false;
        }
        true
    }

    fn body_of(resource: &str, response: HttpResponse) -> Option<String> {
        if !response.is_success() {
            warn!("failed getting server {resource} (status {})", response.status);
            return None;
        }
        Some(response.body_text().into_owned())
    }
}

// ── Parsing ──────────────────────────────────────────────────────

/// Lenient integer parse.
///
/// Skips leading whitespace, accepts one sign, then takes digits until
/// the first non-digit. Returns `0` if no digits follow. Saturates
/// instead of overflowing.
pub fn atoi(text: &str) -> i32 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = (value * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    if negative {
        value = -value;
    }
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Split a `WxH` body at the first `x`. `(0, 0)` when there is none.
pub fn parse_resolution(text: &str) -> (i32, i32) {
    match text.split_once('x') {
        Some((w, h)) => (atoi(w), atoi(h)),
        None => (0, 0),
    }
}
