//! Demuxer that slices an MJPEG body into individual JPEG images.
//!
//! The multipart boundaries and part headers are ignored: every byte
//! range from an SOI marker (`FF D8`) to the next EOI marker (`FF D9`)
//! is one frame. Anything between frames is discarded.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::error::MjpgError;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Upper bound for a single buffered JPEG.
pub const MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct JpegCodec {
    max_frame: usize,
    /// Bytes of the pending frame already searched for EOI. Non-zero
    /// only while the buffer starts with an SOI.
    scanned: usize,
}

impl JpegCodec {
    pub fn new() -> Self {
        Self::with_max_frame(MAX_FRAME_BYTES)
    }

    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            max_frame,
            scanned: 0,
        }
    }
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for JpegCodec {
    type Item = Bytes;
    type Error = MjpgError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(start) = find_marker(src, &JPEG_SOI) else {
            // Keep a trailing 0xFF, it may be the first half of an SOI.
            let keep = usize::from(src.last() == Some(&0xFF));
            src.advance(src.len() - keep);
            return Ok(None);
        };
        src.advance(start);

        // Step back one byte: an EOI may straddle the previous read.
        let from = self.scanned.saturating_sub(1).max(JPEG_SOI.len());
        let Some(end_rel) = find_marker(&src[from..], &JPEG_EOI) else {
            self.scanned = src.len();
            if src.len() > self.max_frame {
                let size = src.len();
                src.clear();
                self.scanned = 0;
                return Err(MjpgError::FrameTooLarge {
                    size,
                    max: self.max_frame,
                });
            }
            return Ok(None);
        };

        self.scanned = 0;
        let end = from + end_rel + JPEG_EOI.len();
        Ok(Some(src.split_to(end).freeze()))
    }
}

fn find_marker(buffer: &[u8], marker: &[u8; 2]) -> Option<usize> {
    buffer.windows(2).position(|w| w == marker)
}
