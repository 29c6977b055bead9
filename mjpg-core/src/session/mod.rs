//! Long-lived capture session with failure recovery.
//!
//! A [`StreamSession`] owns at most one capture handle. Reads that fail
//! or come back empty are counted; once the count passes the retry
//! threshold the handle is torn down and reopened, and the count starts
//! over whether or not the reopen worked.

mod state;

pub use state::SessionPhase;

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::capture::Capture;
use crate::error::MjpgError;
use crate::frame::Frame;

// ── RetryPolicy ──────────────────────────────────────────────────

/// Retry and pacing knobs for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed reads tolerated before a reopen; also the number of open
    /// attempts per `open()`.
    pub max_retry: u32,
    /// Delay before the second open attempt. Doubles per attempt.
    pub retry_delay: Duration,
    /// Cap for the open back-off.
    pub max_retry_delay: Duration,
    /// Pause after a failed read so a dead stream does not spin the
    /// caller. May be zero.
    pub degraded_delay: Duration,
}

impl RetryPolicy {
    /// Shortest delay between open attempts.
    pub const MIN_RETRY_DELAY: Duration = Duration::from_millis(1);

    /// Back-off before open attempt `attempt + 1`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.retry_delay.max(Self::MIN_RETRY_DELAY);
        base.saturating_mul(1u32 << attempt.min(16))
            .min(self.max_retry_delay.max(base))
    }

    fn open_attempts(&self) -> u32 {
        self.max_retry.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry: 20,
            retry_delay: Duration::from_millis(50),
            max_retry_delay: Duration::from_millis(250),
            degraded_delay: Duration::from_millis(50),
        }
    }
}

// ── StreamSession ────────────────────────────────────────────────

/// Exclusive owner of one capture handle to one address.
///
/// All mutating operations take `&mut self`, so a session cannot be
/// pulled from two places at once.
pub struct StreamSession<C: Capture> {
    capture: C,
    address: String,
    handle: Option<C::Handle>,
    phase: SessionPhase,
    policy: RetryPolicy,
    /// Consecutive failed reads.
    failures: u32,
    /// Reopens triggered by the failure threshold.
    reopens: u64,
    /// Dimensions of the last frame read.
    dimensions: (u32, u32),
}

impl<C: Capture> StreamSession<C> {
    /// Create a closed session. Call [`open`](Self::open) to connect.
    pub fn new(capture: C, address: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            capture,
            address: address.into(),
            handle: None,
            phase: SessionPhase::Closed,
            policy,
            failures: 0,
            reopens: 0,
            dimensions: (0, 0),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Consecutive failed reads since the last good frame or reopen.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Number of threshold-triggered reopens so far.
    pub fn reopen_count(&self) -> u64 {
        self.reopens
    }

    /// `(width, height)` of the last frame read, `(0, 0)` if none.
    pub fn resolution(&self) -> (u32, u32) {
        self.dimensions
    }

    /// Open the capture, retrying with back-off.
    ///
    /// Any held handle is released first. After `max_retry` failed
    /// attempts the session stays `Closed`.
    pub async fn open(&mut self) -> Result<(), MjpgError> {
        self.close();

        let attempts = self.policy.open_attempts();
        for attempt in 0..attempts {
            match self.capture.open(&self.address).await {
                Ok(handle) => {
                    self.handle = Some(handle);
                    self.phase.opened()?;
                    self.failures = 0;
                    info!("stream open at {} (attempt {})", self.address, attempt + 1);
                    return Ok(());
                }
                Err(e) => {
                    debug!("open {} attempt {} failed: {e}", self.address, attempt + 1);
                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.policy.backoff(attempt)).await;
                    }
                }
            }
        }

        warn!("failed to open mjpg stream {} after {attempts} attempts", self.address);
        Err(MjpgError::ConnectFailed {
            address: self.address.clone(),
            attempts,
        })
    }

    /// Release the handle. Safe to call at any time, any number of times.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.capture.close(handle);
            debug!("stream {} closed", self.address);
        }
        self.phase.force_close();
    }

    /// [`close`](Self::close) followed by [`open`](Self::open).
    pub async fn reopen(&mut self) -> Result<(), MjpgError> {
        self.close();
        self.open().await
    }

    /// Read the next frame.
    ///
    /// A failed or empty read is counted and returned as an error; the
    /// handle is kept. When the count exceeds `max_retry` the session is
    /// reopened once and the count reset. Reads on a closed session
    /// count as failures, so a session whose first open failed will
    /// retry on its own.
    pub async fn pull(&mut self) -> Result<Frame, MjpgError> {
        let result = match self.handle.as_mut() {
            Some(handle) => match self.capture.read(handle).await {
                Ok(frame) if frame.is_empty() => Err(MjpgError::EmptyFrame),
                other => other,
            },
            None => Err(MjpgError::StreamClosed),
        };

        match result {
            Ok(frame) => {
                self.failures = 0;
                if let Err(e) = self.phase.read_ok() {
                    debug!("{e}");
                }
                self.dimensions = frame.dimensions();
                Ok(frame)
            }
            Err(e) => {
                self.record_failure(&e).await;
                Err(e)
            }
        }
    }

    async fn record_failure(&mut self, error: &MjpgError) {
        self.failures += 1;
        if self.handle.is_some() {
            if let Err(e) = self.phase.read_failed(self.failures) {
                debug!("{e}");
            }
        }
        if error.is_transport() {
            debug!(
                "read from {} failed ({}/{}): {error}",
                self.address, self.failures, self.policy.max_retry
            );
        } else {
            warn!(
                "bad frame from {} ({}/{}): {error}",
                self.address, self.failures, self.policy.max_retry
            );
        }

        if self.failures > self.policy.max_retry {
            warn!(
                "max failed reads exceeded on {}, attempting to connect again",
                self.address
            );
            self.failures = 0;
            self.reopens += 1;
            if let Err(e) = self.reopen().await {
                warn!("failed reinitializing stream: {e}");
            }
            self.failures = 0;
        } else if !self.policy.degraded_delay.is_zero() {
            tokio::time::sleep(self.policy.degraded_delay).await;
        }
    }
}

impl<C: Capture> std::fmt::Debug for StreamSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("address", &self.address)
            .field("phase", &self.phase)
            .field("failures", &self.failures)
            .field("reopens", &self.reopens)
            .finish_non_exhaustive()
    }
}

// ── Tests ────────────────────────────────────────────────────────
