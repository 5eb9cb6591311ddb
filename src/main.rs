//! Scanline barcode scan runner
//!
//! Runs one scan request against the synthetic camera, or one still image,
//! and prints the JSON response.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use tracing::info;

use scanline::bridge::{scan_still, Bridge, SCAN_ACTION};
use scanline::capture::{still, SyntheticCamera};
use scanline::scanner::{encode_marker, Barcode, BarcodeFormat, MarkerDetector};
use scanline::session::{ScanFeedback, ScanResponse};
use scanline::Config;

#[derive(Parser)]
#[command(name = "scanline")]
#[command(about = "Run a barcode scan request", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Scan a still image instead of the synthetic camera
    #[arg(long)]
    image: Option<PathBuf>,

    /// Text the synthetic camera shows once the payload appears
    #[arg(long, default_value = "ABC123")]
    text: String,

    /// Format of the synthetic payload
    #[arg(long, default_value = "QR_CODE")]
    format: BarcodeFormat,

    /// Scan request: JSON array of option objects
    #[arg(default_value = "[]")]
    request: String,
}

/// Rings the terminal bell on a successful scan
struct TerminalBell;

impl ScanFeedback for TerminalBell {
    fn success(&self, _barcode: &Barcode) {
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scanline=debug".into()),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("Scanline Launching...");

    // Load configuration
    let config = Config::load(cli.config.as_deref())?;
    scanline::CONFIG.store(Arc::new(config.clone()));

    let engine = Arc::new(MarkerDetector::new());

    if let Some(path) = &cli.image {
        let frame = still::load_still(path)?;
        let args: serde_json::Value = serde_json::from_str(&cli.request)?;
        let response = scan_still(engine, frame, &args)
            .await?
            .ok_or_else(|| eyre!("No barcode found in {}", path.display()))?;
        println!("{}", serde_json::to_string(&response)?);
        return Ok(());
    }

    let camera = SyntheticCamera::new(config.capture.clone())
        .with_payload(encode_marker(cli.format, &cli.text));
    let bridge = Bridge::new(camera, engine).with_feedback(Arc::new(TerminalBell));

    tokio::select! {
        response = bridge.execute_json(SCAN_ACTION, &cli.request) => {
            let response = response.map_err(|e| eyre!(e))?;
            println!("{}", response);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            println!("{}", serde_json::to_string(&ScanResponse::cancelled())?);
        }
    }

    info!("Scanline shutting down");
    Ok(())
}
