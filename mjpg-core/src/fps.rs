//! Local pull-rate estimator.
//!
//! Counts frames handed to the caller and republishes a rate only once
//! a window holds enough samples, so early readings do not jump around.

use std::time::{Duration, Instant};

/// Minimum window length before the rate is recomputed.
pub const MIN_WINDOW: Duration = Duration::from_millis(100);

/// The window must hold strictly more frames than this.
pub const MIN_FRAMES: u32 = 30;

/// Windowed frames-per-second counter.
///
/// `rate = frames * 1000 / elapsed_ms`, recomputed when the window is
/// at least [`MIN_WINDOW`] long and holds more than [`MIN_FRAMES`]
/// frames. The window then restarts. Between recomputations the last
/// published rate is returned.
#[derive(Debug, Clone)]
pub struct FpsTracker {
    /// Start of the current window.
    window_start: Instant,
    /// Frames seen in the current window.
    frames: u32,
    /// Last published rate.
    rate: i32,
}

impl FpsTracker {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Tracker whose first window opens at `start` (useful for testing).
    pub fn starting_at(start: Instant) -> Self {
        Self {
            window_start: start,
            frames: 0,
            rate: 0,
        }
    }

    /// Count one frame at the current instant.
    pub fn record(&mut self) -> i32 {
        self.record_at(Instant::now())
    }

    /// Count one frame at an explicit timestamp.
    pub fn record_at(&mut self, now: Instant) -> i32 {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= MIN_WINDOW && self.frames > MIN_FRAMES {
            let elapsed_ms = elapsed.as_millis().max(1);
            self.rate = (u128::from(self.frames) * 1000 / elapsed_ms) as i32;
            self.window_start = now;
            self.frames = 0;
        }
        self.rate
    }

    /// Last published rate.
    pub fn fps(&self) -> i32 {
        self.rate
    }

    /// Frames accumulated in the open window.
    pub fn pending_frames(&self) -> u32 {
        self.frames
    }
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────
