//! Decoded frames and the image operations the client needs.
//!
//! A [`Frame`] is an opaque decoded bitmap plus the byte length of the
//! JPEG it was decoded from. Frames are never modified in place:
//! resizing produces a new frame.

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::error::MjpgError;

/// Quality used when re-encoding frames handed out as bytes.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Size of the generated placeholder when none is configured.
pub const DEFAULT_PLACEHOLDER_SIZE: (u32, u32) = (640, 480);

/// Largest width or height accepted for a generated or resized frame.
///
/// 8192 x 8192 RGBA is 256 MiB. Anything larger would make the image
/// buffer allocation abort the process instead of failing.
pub const MAX_DIMENSION: u32 = 8192;

const PLACEHOLDER_BACKGROUND: Rgb<u8> = Rgb([32, 32, 32]);
const PLACEHOLDER_MARK: Rgb<u8> = Rgb([160, 24, 24]);

// ── Frame ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: DynamicImage,
    byte_len: usize,
}

impl Frame {
    pub fn new(image: DynamicImage, byte_len: usize) -> Self {
        Self { image, byte_len }
    }

    /// A frame with no pixels.
    pub fn empty() -> Self {
        Self::new(DynamicImage::new_rgb8(0, 0), 0)
    }

    /// Decode a single JPEG image.
    pub fn decode_jpeg(data: &[u8]) -> Result<Self, MjpgError> {
        let image = image::load_from_memory_with_format(data, ImageFormat::Jpeg)?;
        Ok(Self::new(image, data.len()))
    }

    /// Load any supported image file.
    pub fn load(path: &Path) -> Result<Self, MjpgError> {
        let data = std::fs::read(path)?;
        let image = image::load_from_memory(&data)?;
        Ok(Self::new(image, data.len()))
    }

    /// Reject sizes that are zero or larger than [`MAX_DIMENSION`].
    pub fn check_dimensions(width: u32, height: u32) -> Result<(), MjpgError> {
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(MjpgError::InvalidSize { width, height });
        }
        Ok(())
    }

    /// The built-in "disconnected" image: a dark frame crossed by two
    /// diagonals.
    ///
    /// Each dimension is clamped to `1..=MAX_DIMENSION`.
    pub fn placeholder(width: u32, height: u32) -> Self {
        let (width, height) = (width.clamp(1, MAX_DIMENSION), height.clamp(1, MAX_DIMENSION));
        let mut img = RgbImage::from_pixel(width, height, PLACEHOLDER_BACKGROUND);
        let (w, h) = img.dimensions();
        let steps = w.max(h);
        for i in 0..steps {
            let x = (i as u64 * w as u64 / steps as u64) as u32;
            let y = (i as u64 * h as u64 / steps as u64) as u32;
            img.put_pixel(x, y, PLACEHOLDER_MARK);
            img.put_pixel(w - 1 - x, y, PLACEHOLDER_MARK);
        }
        Self::new(DynamicImage::ImageRgb8(img), 0)
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }

    /// Length of the encoded data this frame was decoded from.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// True when the decoder returned no pixel data.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// A copy scaled to exactly `width` x `height` with linear filtering.
    pub fn resized(&self, width: u32, height: u32) -> Result<Self, MjpgError> {
        Self::check_dimensions(width, height)?;
        Ok(Self::new(
            self.image.resize_exact(width, height, FilterType::Triangle),
            self.byte_len,
        ))
    }

    /// Encode as JPEG.
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, MjpgError> {
        if self.is_empty() {
            return Err(MjpgError::EmptyFrame);
        }
        // JPEG carries no alpha channel.
        let rgb = self.image.to_rgb8();
        let mut out = Cursor::new(Vec::with_capacity(self.byte_len.max(4096)));
        JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).encode_image(&rgb)?;
        Ok(out.into_inner())
    }
}

// ── Tests ────────────────────────────────────────────────────────
