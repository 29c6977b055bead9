//! Minimal HTTP/1.1 request/response exchange.
//!
//! Just enough HTTP to talk to the streaming server's control API and
//! to open the MJPEG stream: one request per connection,
//! `Connection: close`, no redirects, no chunked transfer coding, no
//! TLS.
//!
//! ## Wire format
//!
//! ```text
//! GET /fps HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Accept: */*\r\n
//! Content-Length: 2\r\n          (POST only)
//! Connection: close\r\n
//! \r\n
//! 35                             (POST only)
//! ```

mod exchange;

pub use exchange::HttpExchange;

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use bytes::Bytes;

use crate::error::MjpgError;

/// Status code that marks a successful exchange.
pub const STATUS_OK: u16 = 200;

const PROTOCOL_PREFIX: &str = "HTTP/";

// ── HttpMethod ───────────────────────────────────────────────────

/// The two verbs the control API understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

// ── HttpRequest ──────────────────────────────────────────────────

/// A single request, consumed by one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute request path, e.g. `/fps`.
    pub path: String,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            body: Some(body.into()),
        }
    }

    /// Serialize the request head and body for the given `Host` value.
    pub fn encode(&self, host: &str) -> Vec<u8> {
        let mut head = format!(
            "{} {} HTTP/1.1\r\nHost: {host}\r\nAccept: */*\r\n",
            self.method, self.path
        );
        if let Some(body) = &self.body {
            head.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        head.push_str("Connection: close\r\n\r\n");

        let mut out = head.into_bytes();
        if let Some(body) = &self.body {
            out.extend_from_slice(body.as_bytes());
        }
        out
    }
}

// ── HttpResponse ─────────────────────────────────────────────────

/// Outcome of one exchange.
///
/// `valid` is false when no parsable status line was received,
/// including every transport failure. The body is only read for a
/// 200 response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub valid: bool,
    pub body: Bytes,
}

impl HttpResponse {
    /// A response standing in for a failed or unparsable exchange.
    pub fn invalid() -> Self {
        Self::default()
    }

    /// A well-formed response whose body was not read.
    pub fn status_only(status: u16) -> Self {
        Self {
            status,
            valid: true,
            body: Bytes::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.valid && self.status == STATUS_OK
    }

    /// Body decoded as UTF-8, lossily.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

// ── Parsing ──────────────────────────────────────────────────────

/// Parse `HTTP/1.1 200 OK` into its status code.
pub fn parse_status_line(line: &str) -> Result<u16, MjpgError> {
    let mut parts = line.split_whitespace();
    let version = parts.next().ok_or(MjpgError::InvalidStatusLine)?;
    if !version.starts_with(PROTOCOL_PREFIX) {
        return Err(MjpgError::InvalidStatusLine);
    }
    parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or(MjpgError::InvalidStatusLine)
}

/// Run an I/O future under a deadline, folding the timeout into
/// [`MjpgError::Timeout`].
pub(crate) async fn with_deadline<T, F>(limit: Duration, fut: F) -> Result<T, MjpgError>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(MjpgError::from),
        Err(_) => Err(MjpgError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_has_no_content_length() {
        let raw = HttpRequest::get("/fps").encode("localhost:8080");
        let text = String::from_utf8(raw).unwrap();
        assert!(text.starts_with("GET /fps HTTP/1.1\r\n"));
        assert!(text.contains("Host: localhost:8080\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(!text.contains("Content-Length"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn post_carries_body_and_length() {
        let raw = HttpRequest::post("/resolution", "640x480").encode("cam:81");
        let text = String::from_utf8(raw).unwrap();
        assert!(text.starts_with("POST /resolution HTTP/1.1\r\n"));
        assert!(text.contains("Content-Length: 7\r\n"));
        assert!(text.ends_with("\r\n\r\n640x480"));
    }

    #[test]
    fn parses_status_lines() {
        assert_eq!(parse_status_line("HTTP/1.1 200 OK\r\n").unwrap(), 200);
        assert_eq!(parse_status_line("HTTP/1.0 404 Not Found").unwrap(), 404);
        assert_eq!(parse_status_line("HTTP/1.1 500").unwrap(), 500);
    }

    #[test]
    fn rejects_malformed_status_lines() {
        assert!(parse_status_line("").is_err());
        assert!(parse_status_line("ICY 200 OK").is_err());
        assert!(parse_status_line("HTTP/1.1 abc OK").is_err());
        assert!(parse_status_line("HTTP/1.1").is_err());
    }

    #[test]
    fn response_success_requires_valid_200() {
        assert!(!HttpResponse::invalid().is_success());
        assert!(!HttpResponse::status_only(503).is_success());
        let ok = HttpResponse {
            status: 200,
            valid: true,
            body: Bytes::from_static(b"35"),
        };
        assert!(ok.is_success());
        assert_eq!(ok.body_text(), "35");
    }

    #[tokio::test]
    async fn deadline_turns_into_timeout() {
        let limit = Duration::from_millis(10);
        let result: Result<(), _> = with_deadline(limit, std::future::pending()).await;
        assert!(matches!(result, Err(MjpgError::Timeout(d)) if d == limit));
    }
}
