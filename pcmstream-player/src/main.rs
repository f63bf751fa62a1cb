//! PCM Stream Player - Main entry point
//!
//! Connects to a Server-Sent Events audio stream and plays it on the local
//! output device until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pcmstream_common::config::PipelineConfig;
use pcmstream_common::events::PipelineEvent;
use pcmstream_player::audio::AudioOutput;
use pcmstream_player::network::SseTransport;
use pcmstream_player::Pipeline;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for pcmstream-player
#[derive(Parser, Debug)]
#[command(name = "pcmstream-player")]
#[command(about = "Plays a PCM16 audio stream delivered over Server-Sent Events")]
#[command(version)]
struct Args {
    /// Event stream URL
    #[arg(short, long, env = "PCMSTREAM_URL", required_unless_present = "list_devices")]
    url: Option<String>,

    /// TOML configuration file (defaults are used when omitted)
    #[arg(short, long, env = "PCMSTREAM_CONFIG")]
    config: Option<PathBuf>,

    /// Output device name (default device when omitted or not found)
    #[arg(short, long)]
    device: Option<String>,

    /// Log level, overriding the config file; RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    // Initialize tracing
    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("pcmstream_player={level},pcmstream_common={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.list_devices {
        for name in AudioOutput::list_devices().context("Failed to list output devices")? {
            println!("{}", name);
        }
        return Ok(());
    }
    let url = args.url.context("No stream URL given")?;

    info!("Starting PCM Stream Player");
    if let Some(path) = &args.config {
        info!("Config file: {}", path.display());
    }

    let transport =
        Arc::new(SseTransport::new(&config.receiver).context("Failed to create SSE client")?);
    let sample_rate = config.buffering.sample_rate;
    let (mut pipeline, renderer) =
        Pipeline::new(config, transport).context("Failed to build pipeline")?;

    let mut output = AudioOutput::new(args.device.as_deref(), sample_rate)
        .context("Failed to open audio output")?;
    output
        .start(renderer)
        .context("Failed to start audio output")?;
    info!("Audio output running ({} channels)", output.channels());

    tokio::spawn(log_events(pipeline.subscribe()));

    pipeline
        .connect(&url)
        .await
        .context("Failed to start session")?;

    shutdown_signal().await;

    pipeline.disconnect().await.context("Disconnect failed")?;
    output.stop().context("Failed to stop audio output")?;
    if output.has_error() {
        warn!("Audio device reported {} stream errors", output.error_count());
    }

    info!("Shutdown complete");
    Ok(())
}

/// Log pipeline events that are not already logged at their source
async fn log_events(mut events: broadcast::Receiver<PipelineEvent>) {
    loop {
        match events.recv().await {
            Ok(PipelineEvent::BlockReleased {
                sequence,
                sample_count,
                duration_ms,
                ..
            }) => trace!(
                "Block #{} queued: {} samples ({:.1}ms)",
                sequence,
                sample_count,
                duration_ms
            ),
            Ok(PipelineEvent::BufferOverflow {
                discarded_bytes, ..
            }) => debug!("Overflow event: {} bytes discarded", discarded_bytes),
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => debug!("Pipeline event: {}", json),
                Err(_) => debug!("Pipeline event: {}", event.event_type()),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Event logger lagged, skipped {} events", skipped)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
