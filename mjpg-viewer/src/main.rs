//! MJPEG viewer entry point.
//!
//! ```text
//! mjpg-viewer                        Pull from http://localhost:8080/mjpg
//! mjpg-viewer --url <url>            Pull from another stream
//! mjpg-viewer --config <path>        Use custom config TOML
//! mjpg-viewer --gen-config           Dump default config and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mjpg_core::{MjpgClient, frame::DEFAULT_JPEG_QUALITY};
use mjpg_viewer::config::ViewerConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mjpg-viewer", about = "Pull an MJPEG stream and report its frame rate")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "mjpg-viewer.toml")]
    config: PathBuf,

    /// Stream URL (overrides config). Example: http://192.168.1.50:8080/mjpg
    #[arg(short, long)]
    url: Option<String>,

    /// Stop after this many frames (overrides config).
    #[arg(short = 'n', long)]
    frames: Option<u64>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ViewerConfig::load(&cli.config);
    if let Some(url) = &cli.url {
        config.apply_url(url)?;
    }
    if let Some(frames) = cli.frames {
        config.viewer.max_frames = frames;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("mjpg-viewer v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Connect ──────────────────────────────────────────────

    let mut client = MjpgClient::with_config(config.client.clone()).await;
    info!("stream {} is {}", client.endpoint(), client.phase());

    // ── 2. Tune the server ──────────────────────────────────────

    if config.viewer.quality >= 0 && !client.set_server_quality(config.viewer.quality).await {
        warn!("server refused quality {}", config.viewer.quality);
    }
    if config.viewer.fps >= 0 && !client.set_server_fps(config.viewer.fps).await {
        warn!("server refused fps {}", config.viewer.fps);
    }

    // ── 3. Pull loop ────────────────────────────────────────────

    let print_every = config.viewer.print_every.max(1);
    let max_frames = config.viewer.max_frames;
    let mut count: u64 = 0;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let frame = tokio::select! {
            _ = &mut shutdown => {
                info!("interrupted");
                break;
            }
            frame = client.pull_frame() => frame,
        };

        if count % print_every == 0 {
            let (w, h) = frame.dimensions();
            info!("FPS: {} ({w}x{h}, {})", client.fps(), client.phase());
            if let Some(path) = config.snapshot_path() {
                match frame.encode_jpeg(DEFAULT_JPEG_QUALITY) {
                    Ok(bytes) => {
                        if let Err(e) = tokio::fs::write(path, bytes).await {
                            warn!("failed writing snapshot {}: {e}", path.display());
                        }
                    }
                    Err(e) => warn!("failed encoding snapshot: {e}"),
                }
            }
        }
        count += 1;
        if max_frames > 0 && count >= max_frames {
            break;
        }
    }

    // ── 4. Shutdown ─────────────────────────────────────────────

    let stats = client.stats();
    info!(
        "shutting down after {} pulls ({} from cache, {} reopens)",
        stats.total_pulls, stats.fallback_pulls, stats.reopens
    );
    drop(client);

    Ok(())
}
