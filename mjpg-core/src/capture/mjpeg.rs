//! MJPEG-over-HTTP capture.
//!
//! Opens one long-lived `GET` against the stream path and pulls JPEG
//! images out of the `multipart/x-mixed-replace` body.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use tracing::debug;

use super::Capture;
use super::codec::JpegCodec;
use crate::endpoint::Endpoint;
use crate::error::MjpgError;
use crate::frame::Frame;
use crate::http::{HttpExchange, HttpRequest};

/// An open MJPEG stream.
pub struct MjpegHandle {
    frames: FramedRead<BufReader<TcpStream>, JpegCodec>,
    address: String,
}

impl MjpegHandle {
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl std::fmt::Debug for MjpegHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MjpegHandle")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Default [`Capture`]: HTTP GET plus SOI/EOI demuxing.
#[derive(Debug, Clone)]
pub struct HttpMjpegCapture {
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl HttpMjpegCapture {
    /// `read_timeout` bounds both the response head and every frame read.
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            read_timeout,
        }
    }
}

impl Default for HttpMjpegCapture {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), Duration::from_secs(5))
    }
}

#[async_trait]
impl Capture for HttpMjpegCapture {
    type Handle = MjpegHandle;

    async fn open(&self, address: &str) -> Result<MjpegHandle, MjpgError> {
        let endpoint = Endpoint::parse(address)?;
        let request = HttpRequest::get(Endpoint::request_path(endpoint.path()));
        let exchange = HttpExchange::new(endpoint, self.connect_timeout, self.read_timeout);
        let reader = exchange.open(&request).await?;

        debug!("mjpeg stream open at {address}");
        Ok(MjpegHandle {
            frames: FramedRead::new(reader, JpegCodec::new()),
            address: address.to_string(),
        })
    }

    async fn read(&self, handle: &mut MjpegHandle) -> Result<Frame, MjpgError> {
        let next = tokio::time::timeout(self.read_timeout, handle.frames.next())
            .await
            .map_err(|_| MjpgError::Timeout(self.read_timeout))?;

        match next {
            Some(Ok(jpeg)) => Frame::decode_jpeg(&jpeg),
            Some(Err(e)) => Err(e),
            None => Err(MjpgError::StreamClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::tests::jpeg_bytes;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one MJPEG response containing `frames`, then closes.
    async fn mjpeg_server(frames: Vec<Vec<u8>>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await.unwrap();
            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: multipart/x-mixed-replace; boundary=frame\r\n\r\n",
                )
                .await
                .unwrap();
            for jpeg in frames {
                let part = format!(
                    "--frame\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
                    jpeg.len()
                );
                stream.write_all(part.as_bytes()).await.unwrap();
                stream.write_all(&jpeg).await.unwrap();
                stream.write_all(b"\r\n").await.unwrap();
            }
        });
        format!("http://127.0.0.1:{port}/mjpg")
    }

    fn capture() -> HttpMjpegCapture {
        HttpMjpegCapture::new(Duration::from_secs(2), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn reads_frames_then_reports_close() {
        let address = mjpeg_server(vec![jpeg_bytes(32, 24), jpeg_bytes(16, 8)]).await;
        let capture = capture();
        let mut handle = capture.open(&address).await.unwrap();
        assert_eq!(handle.address(), address);

        assert_eq!(capture.read(&mut handle).await.unwrap().dimensions(), (32, 24));
        assert_eq!(capture.read(&mut handle).await.unwrap().dimensions(), (16, 8));
        assert!(capture.read(&mut handle).await.is_err());
        capture.close(handle);
    }

    #[tokio::test]
    async fn open_fails_on_refused_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = capture().open(&format!("http://127.0.0.1:{port}/mjpg")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn open_rejects_bad_address() {
        let result = capture().open("rtsp://camera/stream").await;
        assert!(matches!(result, Err(MjpgError::InvalidAddress(_))));
    }
}
