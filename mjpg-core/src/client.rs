//! The public client facade.
//!
//! [`MjpgClient`] ties the stream session, the frame cache, the local
//! fps counter and the control channel together behind calls that
//! never fail: pulls always hand back a displayable frame and control
//! calls fall back to sentinel values.

use std::path::Path;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::FrameCache;
use crate::capture::{Capture, HttpMjpegCapture};
use crate::config::ClientConfig;
use crate::control::ControlClient;
use crate::endpoint::Endpoint;
use crate::fps::FpsTracker;
use crate::frame::{DEFAULT_JPEG_QUALITY, DEFAULT_PLACEHOLDER_SIZE, Frame};
use crate::session::{SessionPhase, StreamSession};

// ── PullStats ────────────────────────────────────────────────────

/// Counters published after every pull.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullStats {
    /// Local pull rate.
    pub fps: i32,
    /// Pulls since the client was created.
    pub total_pulls: u64,
    /// Pulls answered from the cache instead of the stream.
    pub fallback_pulls: u64,
    /// Reopens triggered by failed reads.
    pub reopens: u64,
    /// Dimensions of the last frame read from the stream.
    pub width: u32,
    pub height: u32,
}

// ── MjpgClient ───────────────────────────────────────────────────

/// Pull client for one MJPEG stream plus its server's control API.
///
/// Frames handed out by [`pull_frame`](Self::pull_frame) are also
/// published on a `watch` channel so other tasks can show the latest
/// frame without touching the session.
pub struct MjpgClient<C: Capture = HttpMjpegCapture> {
    endpoint: Endpoint,
    session: StreamSession<C>,
    cache: FrameCache,
    fps: FpsTracker,
    control: ControlClient,
    stats: PullStats,
    frame_tx: watch::Sender<Frame>,
    frame_rx: watch::Receiver<Frame>,
    stats_tx: watch::Sender<PullStats>,
    stats_rx: watch::Receiver<PullStats>,
}

impl MjpgClient<HttpMjpegCapture> {
    /// Connect to `host:port/path` with default settings.
    ///
    /// `host` keeps its scheme (`http://localhost`). A failed first
    /// connect is logged, not returned: pulls keep retrying.
    pub async fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self::with_config(ClientConfig::for_endpoint(host, port, path)).await
    }

    /// Connect using `config`.
    pub async fn with_config(config: ClientConfig) -> Self {
        let capture = HttpMjpegCapture::new(config.connect_timeout(), config.read_timeout());
        Self::with_capture(config, capture).await
    }
}

impl<C: Capture> MjpgClient<C> {
    /// Connect through a caller-supplied capture.
    pub async fn with_capture(config: ClientConfig, capture: C) -> Self {
        let endpoint = config.endpoint();
        let cache = Self::build_cache(&config);
        let control = ControlClient::new(
            endpoint.clone(),
            config.connect_timeout(),
            config.io_timeout(),
        );
        let mut session = StreamSession::new(capture, endpoint.address(), config.retry_policy());
        match session.open().await {
            Ok(()) => info!("connected to {endpoint}"),
            Err(e) => warn!("initial connect to {endpoint} failed: {e}"),
        }

        let (frame_tx, frame_rx) = watch::channel(cache.current_frame().clone());
        let (stats_tx, stats_rx) = watch::channel(PullStats::default());
        Self {
            endpoint,
            session,
            cache,
            fps: FpsTracker::new(),
            control,
            stats: PullStats::default(),
            frame_tx,
            frame_rx,
            stats_tx,
            stats_rx,
        }
    }

    fn build_cache(config: &ClientConfig) -> FrameCache {
        let size = config.placeholder_size().filter(|&(w, h)| {
            let check = Frame::check_dimensions(w, h);
            if let Err(e) = &check {
                warn!("ignoring configured placeholder size: {e}");
            }
            check.is_ok()
        });
        let mut cache = match Frame::load(&config.placeholder.path) {
            Ok(frame) => FrameCache::with_placeholder(frame),
            Err(e) => {
                debug!(
                    "placeholder {} unavailable ({e}); generating one",
                    config.placeholder.path.display()
                );
                let (w, h) = size.unwrap_or(DEFAULT_PLACEHOLDER_SIZE);
                FrameCache::with_placeholder(Frame::placeholder(w, h))
            }
        };
        if let Some((w, h)) = size {
            cache.set_placeholder_size(w, h);
        }
        cache
    }

    // ── Frames ───────────────────────────────────────────────────

    /// Next frame from the stream, or the last good frame, or the
    /// placeholder. Never empty.
    pub async fn pull_frame(&mut self) -> Frame {
        let fresh = match self.session.pull().await {
            Ok(frame) => self.cache.update(frame),
            Err(e) => {
                debug!("pull fell back to cache: {e}");
                false
            }
        };
        let frame = self.cache.current_frame().clone();

        self.stats.total_pulls += 1;
        if !fresh {
            self.stats.fallback_pulls += 1;
        }
        self.stats.fps = self.fps.record();
        self.stats.reopens = self.session.reopen_count();
        (self.stats.width, self.stats.height) = self.session.resolution();

        self.frame_tx.send_replace(frame.clone());
        self.stats_tx.send_replace(self.stats);
        frame
    }

    /// [`pull_frame`](Self::pull_frame) encoded as JPEG. Empty if
    /// encoding fails.
    pub async fn pull_frame_bytes(&mut self) -> Vec<u8> {
        let frame = self.pull_frame().await;
        frame.encode_jpeg(DEFAULT_JPEG_QUALITY).unwrap_or_else(|e| {
            warn!("failed encoding frame: {e}");
            Vec::new()
        })
    }

    /// Local pull rate.
    pub fn fps(&self) -> i32 {
        self.fps.fps()
    }

    /// Latest frame handed to the caller.
    pub fn frame_receiver(&self) -> watch::Receiver<Frame> {
        self.frame_rx.clone()
    }

    pub fn stats_receiver(&self) -> watch::Receiver<PullStats> {
        self.stats_rx.clone()
    }

    pub fn stats(&self) -> PullStats {
        self.stats
    }

    // ── Server control ───────────────────────────────────────────

    pub async fn server_fps(&self) -> i32 {
        self.control.server_fps().await
    }

    pub async fn set_server_fps(&self, fps: i32) -> bool {
        self.control.set_server_fps(fps).await
    }

    pub async fn server_quality(&self) -> i32 {
        self.control.server_quality().await
    }

    pub async fn set_server_quality(&self, quality: i32) -> bool {
        self.control.set_server_quality(quality).await
    }

    pub async fn server_resolution(&self) -> (i32, i32) {
        self.control.server_resolution().await
    }

    pub async fn set_server_resolution(&self, width: i32, height: i32) -> bool {
        self.control.set_server_resolution(width, height).await
    }

    pub async fn server_connections(&self) -> i32 {
        self.control.server_connections().await
    }

    pub async fn set_server_connections(&self, connections: i32) -> bool {
        self.control.set_server_connections(connections).await
    }

    // ── Placeholder ──────────────────────────────────────────────

    pub fn set_placeholder_size(&mut self, width: u32, height: u32) -> bool {
        self.cache.set_placeholder_size(width, height)
    }

    pub fn set_placeholder_path(&mut self, path: impl AsRef<Path>) -> bool {
        self.cache.set_placeholder_image(path.as_ref())
    }

    // ── State ────────────────────────────────────────────────────

    /// Dimensions of the last frame read from the stream, `(0, 0)`
    /// before the first one.
    pub fn resolution(&self) -> (u32, u32) {
        self.session.resolution()
    }

    pub fn phase(&self) -> &SessionPhase {
        self.session.phase()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn session(&self) -> &StreamSession<C> {
        &self.session
    }

    pub fn control(&self) -> &ControlClient {
        &self.control
    }
}

impl<C: Capture> Drop for MjpgClient<C> {
    fn drop(&mut self) {
        self.session.close();
    }
}

impl<C: Capture> std::fmt::Debug for MjpgClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MjpgClient")
            .field("endpoint", &self.endpoint)
            .field("session", &self.session)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MjpgError;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    /// Capture that serves 16x12 frames while `up` is set.
    #[derive(Clone, Default)]
    struct SwitchCapture {
        up: Arc<AtomicBool>,
        closes: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Capture for SwitchCapture {
        type Handle = ();

        async fn open(&self, _address: &str) -> Result<(), MjpgError> {
            if self.up.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(MjpgError::StreamClosed)
            }
        }

        async fn read(&self, _handle: &mut ()) -> Result<Frame, MjpgError> {
            if self.up.load(Ordering::SeqCst) {
                Ok(Frame::placeholder(16, 12))
            } else {
                Err(MjpgError::StreamClosed)
            }
        }

        fn close(&self, _handle: ()) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn config() -> ClientConfig {
        let mut cfg = ClientConfig::for_endpoint("http://127.0.0.1", 9, "mjpg");
        cfg.stream.max_retry = 2;
        cfg.stream.retry_delay_ms = 1;
        cfg.stream.max_retry_delay_ms = 1;
        cfg.stream.degraded_delay_ms = 0;
        cfg.placeholder.path = "/no/such/placeholder.jpg".into();
        cfg.placeholder.width = Some(40);
        cfg.placeholder.height = Some(30);
        cfg
    }

    #[tokio::test]
    async fn dead_stream_serves_placeholder() {
        let mut client = MjpgClient::with_capture(config(), SwitchCapture::default()).await;
        assert!(client.phase().is_closed());
        for _ in 0..10 {
            let frame = client.pull_frame().await;
            assert_eq!(frame.dimensions(), (40, 30));
        }
        assert_eq!(client.resolution(), (0, 0));
        assert_eq!(client.stats().fallback_pulls, 10);
    }

    #[tokio::test]
    async fn last_good_frame_survives_outage() {
        let capture = SwitchCapture::default();
        capture.up.store(true, Ordering::SeqCst);
        let mut client = MjpgClient::with_capture(config(), capture.clone()).await;

        assert_eq!(client.pull_frame().await.dimensions(), (16, 12));
        assert_eq!(client.resolution(), (16, 12));

        capture.up.store(false, Ordering::SeqCst);
        for _ in 0..5 {
            assert_eq!(client.pull_frame().await.dimensions(), (16, 12));
        }
        assert!(client.stats().reopens >= 1);

        capture.up.store(true, Ordering::SeqCst);
        // At most max_retry + 1 pulls until the session reopens.
        for _ in 0..4 {
            client.pull_frame().await;
        }
        assert!(client.phase().has_handle());
    }

    #[tokio::test]
    async fn pulls_are_published() {
        let capture = SwitchCapture::default();
        capture.up.store(true, Ordering::SeqCst);
        let mut client = MjpgClient::with_capture(config(), capture).await;
        let mut frames = client.frame_receiver();
        let stats = client.stats_receiver();

        client.pull_frame().await;
        assert!(frames.has_changed().unwrap());
        assert_eq!(frames.borrow_and_update().dimensions(), (16, 12));
        assert_eq!(stats.borrow().total_pulls, 1);
        assert_eq!(stats.borrow().fallback_pulls, 0);
    }

    #[tokio::test]
    async fn pull_frame_bytes_is_jpeg() {
        let mut client = MjpgClient::with_capture(config(), SwitchCapture::default()).await;
        let bytes = client.pull_frame_bytes().await;
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(Frame::decode_jpeg(&bytes).unwrap().dimensions(), (40, 30));
    }

    #[tokio::test]
    async fn placeholder_can_be_resized() {
        let mut client = MjpgClient::with_capture(config(), SwitchCapture::default()).await;
        assert!(client.set_placeholder_size(64, 48));
        assert!(!client.set_placeholder_size(0, 48));
        assert_eq!(client.pull_frame().await.dimensions(), (64, 48));
        assert!(!client.set_placeholder_path("/no/such/file.jpg"));
    }

    #[tokio::test]
    async fn oversized_configured_placeholder_falls_back_to_default() {
        let mut cfg = config();
        cfg.placeholder.width = Some(u32::MAX);
        cfg.placeholder.height = Some(u32::MAX);
        let mut client = MjpgClient::with_capture(cfg, SwitchCapture::default()).await;

        assert_eq!(client.pull_frame().await.dimensions(), DEFAULT_PLACEHOLDER_SIZE);
        assert!(!client.set_placeholder_size(u32::MAX, 1));
        assert_eq!(client.pull_frame().await.dimensions(), DEFAULT_PLACEHOLDER_SIZE);
    }

    #[tokio::test]
    async fn drop_closes_session() {
        let capture = SwitchCapture::default();
        capture.up.store(true, Ordering::SeqCst);
        let client = MjpgClient::with_capture(config(), capture.clone()).await;
        assert!(client.phase().is_open());
        drop(client);
        assert_eq!(capture.closes.load(Ordering::SeqCst), 1);
    }
}
