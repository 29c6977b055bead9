//! Video capture collaborators.
//!
//! The stream session only needs three things from a capture: open an
//! address, read the next decoded frame, close the handle. [`Capture`]
//! is that seam; [`HttpMjpegCapture`] is the default implementation
//! that speaks MJPEG over HTTP.
//!
//! | Module   | Purpose                                            |
//! |----------|----------------------------------------------------|
//! | `codec`  | SOI/EOI demuxer turning the body into JPEG buffers |
//! | `mjpeg`  | HTTP capture built on the exchange and the codec   |

pub mod codec;
pub mod mjpeg;

pub use codec::JpegCodec;
pub use mjpeg::{HttpMjpegCapture, MjpegHandle};

use async_trait::async_trait;

use crate::error::MjpgError;
use crate::frame::Frame;

/// Source of decoded frames for a [`StreamSession`](crate::StreamSession).
///
/// `Handle` is owned exclusively by the session that opened it.
#[async_trait]
pub trait Capture: Send + Sync {
    type Handle: Send;

    /// Open `address` (`host:port/path`, scheme included).
    async fn open(&self, address: &str) -> Result<Self::Handle, MjpgError>;

    /// Read and decode the next frame.
    async fn read(&self, handle: &mut Self::Handle) -> Result<Frame, MjpgError>;

    /// Release the handle.
    fn close(&self, handle: Self::Handle) {
        drop(handle);
    }
}
