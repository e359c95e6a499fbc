//! signalfx-uploader - replay aggregated load-test results into SignalFx
//!
//! This is the composition root that wires together all the components.

use signalfx_uploader::infrastructure::{shutdown_signal, ShutdownController};
use signalfx_uploader::{load_config, JsonLinesReplay, Reporter, SignalfxUploader};
use std::time::Duration;
use tokio::io::{AsyncBufRead, BufReader};
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting signalfx-uploader project={} ingest={}",
        cfg.project,
        cfg.data_address
    );

    // ===== COMPOSITION ROOT =====

    // 1. Host side: samples come from a JSON-lines file or stdin
    let samples_path = std::env::var("SIGNALFX_SAMPLES_PATH").ok();
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &samples_path {
        Some(path) => {
            tracing::info!("replaying samples from {}", path);
            Box::new(BufReader::new(tokio::fs::File::open(path).await?))
        }
        None => {
            tracing::info!("replaying samples from stdin");
            Box::new(BufReader::new(tokio::io::stdin()))
        }
    };
    let mut replay = JsonLinesReplay::new();

    // 2. Reporter
    let mut uploader = SignalfxUploader::new(cfg);
    uploader.prepare(Some(&mut replay)).await?;

    // 3. Signals
    let shutdown = ShutdownController::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    // 4. Run
    let stats = replay
        .run(reader, &mut uploader, Duration::from_secs(1), &shutdown)
        .await?;

    let range = uploader.time_range();
    tracing::info!(
        "done: {} samples sent, {} skipped, first_ts={:?} last_ts={:?}",
        stats.dispatched,
        stats.skipped,
        range.first_ts,
        range.last_ts
    );

    Ok(())
}
