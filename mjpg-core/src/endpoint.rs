//! Stream endpoint addressing.
//!
//! An [`Endpoint`] is the `(host, port, path)` triple the client was
//! built with. The capture address keeps the scheme
//! (`http://localhost:8080/mjpg`); the control channel strips it before
//! resolving.

use std::fmt;

use crate::error::MjpgError;

const HTTP_SCHEME: &str = "http://";
const DEFAULT_HTTP_PORT: u16 = 80;

/// Where the MJPEG stream and the control API live.
///
/// `path` never carries a leading slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
    path: String,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, path: impl AsRef<str>) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            port,
            path: path.as_ref().trim_start_matches('/').to_string(),
        }
    }

    /// Parse a capture address of the form `[http://]host[:port][/path]`.
    pub fn parse(address: &str) -> Result<Self, MjpgError> {
        let (scheme, rest) = match address.strip_prefix(HTTP_SCHEME) {
            Some(rest) => (HTTP_SCHEME, rest),
            None if address.contains("://") => {
                return Err(MjpgError::InvalidAddress(address.to_string()));
            }
            None => ("", address),
        };
        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| MjpgError::InvalidAddress(address.to_string()))?;
                (host, port)
            }
            None => (authority, DEFAULT_HTTP_PORT),
        };
        if host.is_empty() {
            return Err(MjpgError::InvalidAddress(address.to_string()));
        }
        Ok(Self::new(format!("{scheme}{host}"), port, path))
    }

    /// Host as configured, scheme included.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stream path segment, without a leading slash.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Capture address: `host:port/path`.
    pub fn address(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.path)
    }

    /// Host with the `http://` prefix removed, for name resolution.
    pub fn resolver_host(&self) -> &str {
        self.host.strip_prefix(HTTP_SCHEME).unwrap_or(&self.host)
    }

    /// `host:port` pair handed to the resolver.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.resolver_host(), self.port)
    }

    /// Absolute request path for a control segment such as `fps`.
    pub fn request_path(segment: &str) -> String {
        format!("/{}", segment.trim_start_matches('/'))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}
