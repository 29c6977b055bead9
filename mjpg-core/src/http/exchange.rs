//! One-shot HTTP exchange over a fresh TCP connection.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use super::{HttpRequest, HttpResponse, STATUS_OK, parse_status_line, with_deadline};
use crate::endpoint::Endpoint;
use crate::error::MjpgError;

/// Status line plus headers.
pub const MAX_HEAD_BYTES: usize = 16 * 1024;
/// Control replies are a few bytes; anything past this is not one.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Sends requests to one endpoint, one connection per request.
///
/// No pooling and no keep-alive: the socket is dropped when the
/// exchange finishes.
#[derive(Debug, Clone)]
pub struct HttpExchange {
    endpoint: Endpoint,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl HttpExchange {
    pub fn new(endpoint: Endpoint, connect_timeout: Duration, io_timeout: Duration) -> Self {
        Self {
            endpoint,
            connect_timeout,
            io_timeout,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Perform the exchange, absorbing every failure.
    ///
    /// Transport and protocol errors are logged and come back as an
    /// invalid response; a non-200 status comes back with its code
    /// and an empty body.
    pub async fn send(&self, request: &HttpRequest) -> HttpResponse {
        match self.try_send(request).await {
            Ok(response) => response,
            Err(MjpgError::InvalidStatusLine) => {
                warn!("{} {}: invalid response", request.method, request.path);
                HttpResponse::invalid()
            }
            Err(MjpgError::Status(code)) => {
                warn!(
                    "{} {}: response returned with non 200 status code {code}",
                    request.method, request.path
                );
                HttpResponse::status_only(code)
            }
            Err(e) => {
                warn!("{} {} failed: {e}", request.method, request.path);
                HttpResponse::invalid()
            }
        }
    }

    /// Perform the exchange, reporting failures as errors.
    ///
    /// The body is read until the server closes the connection. The
    /// response `Content-Length` is ignored and chunked transfer coding
    /// is not decoded, so this only suits servers that close after
    /// responding.
    ///
    /// The whole body must arrive within one `io_timeout` and may not
    /// exceed [`MAX_BODY_BYTES`].
    pub async fn try_send(&self, request: &HttpRequest) -> Result<HttpResponse, MjpgError> {
        let mut reader = self.open(request).await?;
        let body = within(self.io_timeout, read_body(&mut reader)).await?;

        debug!(
            "{} {} -> {} ({} body bytes)",
            request.method,
            request.path,
            STATUS_OK,
            body.len()
        );

        Ok(HttpResponse {
            status: STATUS_OK,
            valid: true,
            body,
        })
    }

    /// Connect, send `request`, and consume the status line and headers.
    ///
    /// Returns the reader positioned at the first body byte. Used
    /// directly by the MJPEG capture, whose body never ends. The head
    /// must arrive within one `io_timeout` and fit in [`MAX_HEAD_BYTES`].
    pub async fn open(&self, request: &HttpRequest) -> Result<BufReader<TcpStream>, MjpgError> {
        let addr = self.endpoint.socket_addr();
        let stream = with_deadline(self.connect_timeout, TcpStream::connect(addr.as_str())).await?;
        stream.set_nodelay(true)?;

        let mut reader = BufReader::new(stream);
        let raw = request.encode(&addr);
        with_deadline(self.io_timeout, reader.get_mut().write_all(&raw)).await?;

        within(self.io_timeout, read_head(&mut reader)).await?;
        Ok(reader)
    }
}

async fn within<T, F>(limit: Duration, fut: F) -> Result<T, MjpgError>
where
    F: Future<Output = Result<T, MjpgError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| MjpgError::Timeout(limit))?
}

/// Consume the status line and headers, failing on a non-200 status.
async fn read_head<R>(reader: &mut R) -> Result<(), MjpgError>
where
    R: AsyncBufRead + Unpin,
{
    let mut budget = MAX_HEAD_BYTES;
    let mut line = Vec::new();

    if read_head_line(reader, &mut line, &mut budget).await? == 0 {
        return Err(MjpgError::StreamClosed);
    }
    let status = parse_status_line(&String::from_utf8_lossy(&line))?;
    if status != STATUS_OK {
        return Err(MjpgError::Status(status));
    }

    // Headers are not consumed by any caller, so they are never decoded.
    loop {
        let n = read_head_line(reader, &mut line, &mut budget).await?;
        if n == 0 || line.iter().all(|&b| b == b'\r' || b == b'\n') {
            return Ok(());
        }
    }
}

async fn read_head_line<R>(
    reader: &mut R,
    line: &mut Vec<u8>,
    budget: &mut usize,
) -> Result<usize, MjpgError>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    let n = (&mut *reader)
        .take(*budget as u64)
        .read_until(b'\n', line)
        .await?;
    *budget -= n;
    if *budget == 0 && !line.ends_with(b"\n") {
        return Err(MjpgError::ResponseTooLarge {
            limit: MAX_HEAD_BYTES,
        });
    }
    Ok(n)
}

async fn read_body<R>(reader: &mut R) -> Result<Bytes, MjpgError>
where
    R: AsyncRead + Unpin,
{
    let mut body = Vec::new();
    (&mut *reader)
        .take(MAX_BODY_BYTES as u64 + 1)
        .read_to_end(&mut body)
        .await?;
    if body.len() > MAX_BODY_BYTES {
        return Err(MjpgError::ResponseTooLarge {
            limit: MAX_BODY_BYTES,
        });
    }
    Ok(Bytes::from(body))
}
