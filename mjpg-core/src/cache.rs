//! Last-good frame and the "disconnected" placeholder.

use std::path::Path;

use tracing::warn;

use crate::frame::{DEFAULT_PLACEHOLDER_SIZE, Frame, MAX_DIMENSION};

/// Holds at most two frames: the latest good one and the placeholder.
///
/// [`current_frame`](Self::current_frame) never returns an empty frame:
/// `last_good` only ever stores non-empty frames and the placeholder is
/// always decodable.
#[derive(Debug, Clone)]
pub struct FrameCache {
    last_good: Option<Frame>,
    placeholder: Frame,
    /// Size applied to every placeholder, once configured.
    placeholder_size: Option<(u32, u32)>,
}

impl FrameCache {
    /// Cache using the built-in placeholder.
    pub fn new() -> Self {
        let (w, h) = DEFAULT_PLACEHOLDER_SIZE;
        Self::with_placeholder(Frame::placeholder(w, h))
    }

    /// Cache using `placeholder`, or the built-in one if it is empty.
    pub fn with_placeholder(placeholder: Frame) -> Self {
        let placeholder = if placeholder.is_empty() {
            let (w, h) = DEFAULT_PLACEHOLDER_SIZE;
            Frame::placeholder(w, h)
        } else {
            placeholder
        };
        Self {
            last_good: None,
            placeholder,
            placeholder_size: None,
        }
    }

    /// Keep `frame` as the last good frame unless it is empty.
    ///
    /// Returns whether the frame was kept.
    pub fn update(&mut self, frame: Frame) -> bool {
        if frame.is_empty() {
            return false;
        }
        self.last_good = Some(frame);
        true
    }

    /// The last good frame, or the placeholder if none arrived yet.
    pub fn current_frame(&self) -> &Frame {
        self.last_good.as_ref().unwrap_or(&self.placeholder)
    }

    pub fn last_good(&self) -> Option<&Frame> {
        self.last_good.as_ref()
    }

    pub fn placeholder(&self) -> &Frame {
        &self.placeholder
    }

    pub fn placeholder_size(&self) -> Option<(u32, u32)> {
        self.placeholder_size
    }

    /// Resize the placeholder and remember the size for later swaps.
    ///
    /// Zero dimensions and dimensions above [`MAX_DIMENSION`] are
    /// rejected and leave the placeholder untouched.
    pub fn set_placeholder_size(&mut self, width: u32, height: u32) -> bool {
        if self.placeholder.dimensions() != (width, height) {
            match self.placeholder.resized(width, height) {
                Ok(resized) => self.placeholder = resized,
                Err(e) => {
                    warn!("rejecting placeholder size {width}x{height}: {e}");
                    return false;
                }
            }
        }
        self.placeholder_size = Some((width, height));
        true
    }

    /// Replace the placeholder with an image file.
    ///
    /// On failure the current placeholder is kept. A previously
    /// configured size is applied to the new image.
    pub fn set_placeholder_image(&mut self, path: &Path) -> bool {
        let frame = match Frame::load(path) {
            Ok(frame) if !frame.is_empty() => frame,
            Ok(_) => {
                warn!("placeholder {} is empty; keeping current", path.display());
                return false;
            }
            Err(e) => {
                warn!("failed to load placeholder {}: {e}", path.display());
                return false;
            }
        };
        self.placeholder = match self.placeholder_size {
            Some((w, h)) => match frame.resized(w, h) {
                Ok(resized) => resized,
                Err(e) => {
                    warn!("failed resizing placeholder {}: {e}", path.display());
                    return false;
                }
            },
            None => frame,
        };
        true
    }
}

impl Default for FrameCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::tests::jpeg_bytes;

    #[test]
    fn placeholder_until_first_frame() {
        let cache = FrameCache::new();
        assert!(cache.last_good().is_none());
        assert_eq!(cache.current_frame(), cache.placeholder());
        assert!(!cache.current_frame().is_empty());
    }

    #[test]
    fn empty_frames_are_ignored() {
        let mut cache = FrameCache::new();
        let good = Frame::placeholder(8, 8);
        assert!(cache.update(good.clone()));
        assert!(!cache.update(Frame::empty()));
        assert_eq!(cache.current_frame(), &good);
    }

    #[test]
    fn empty_placeholder_falls_back_to_builtin() {
        let cache = FrameCache::with_placeholder(Frame::empty());
        assert_eq!(cache.placeholder().dimensions(), DEFAULT_PLACEHOLDER_SIZE);
    }

    #[test]
    fn resize_is_idempotent() {
        let mut cache = FrameCache::new();
        assert!(cache.set_placeholder_size(320, 200));
        let first = cache.placeholder().dimensions();
        assert!(cache.set_placeholder_size(320, 200));
        assert_eq!(first, (320, 200));
        assert_eq!(cache.placeholder().dimensions(), first);
    }

    #[test]
    fn zero_size_rejected() {
        let mut cache = FrameCache::new();
        assert!(!cache.set_placeholder_size(0, 10));
        assert_eq!(cache.placeholder_size(), None);
    }

    #[test]
    fn huge_size_rejected_without_touching_placeholder() {
        let mut cache = FrameCache::new();
        assert!(cache.set_placeholder_size(320, 200));
        let before = cache.placeholder().clone();

        assert!(!cache.set_placeholder_size(u32::MAX, u32::MAX));
        assert!(!cache.set_placeholder_size(MAX_DIMENSION + 1, 10));
        assert_eq!(cache.placeholder(), &before);
        assert_eq!(cache.placeholder_size(), Some((320, 200)));
        assert!(!cache.current_frame().is_empty());
    }

    #[test]
    fn loaded_placeholder_takes_configured_size() {
        let dir = std::env::temp_dir().join(format!("mjpg-cache-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("noconnection.jpg");
        std::fs::write(&path, jpeg_bytes(50, 50)).unwrap();

        let mut cache = FrameCache::new();
        cache.set_placeholder_size(100, 80);
        assert!(cache.set_placeholder_image(&path));
        assert_eq!(cache.placeholder().dimensions(), (100, 80));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn bad_placeholder_path_keeps_current() {
        let mut cache = FrameCache::new();
        let before = cache.placeholder().clone();
        assert!(!cache.set_placeholder_image(Path::new("/no/such/image.jpg")));
        assert_eq!(cache.placeholder(), &before);
    }
}
