//! waveplot-scanner - WavePlot generator and uploader
//!
//! Walks a music directory, analyzes every recognised audio file with
//! libwaveplot and uploads the resulting WavePlots to a WavePlot server,
//! linking each one to the file's MusicBrainz tags.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use waveplot_common::config::TomlConfig;
use waveplot_scanner::config::{prompt_editor_key, CliArgs, ScannerConfig};
use waveplot_scanner::ffi::libwaveplot::NativeEngine;
use waveplot_scanner::services::WavePlotClient;
use waveplot_scanner::workflow::{Pipeline, PipelineEvent, PipelineState};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    if !args.directory.is_dir() {
        eprintln!("Not a directory: {}", args.directory.display());
        std::process::exit(1);
    }

    let toml = TomlConfig::load_or_default(args.config.as_deref())?;
    let mut config = ScannerConfig::resolve(&args, &toml);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "waveplot_scanner={0},waveplot_common={0}",
                    config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting waveplot-scanner {}", env!("CARGO_PKG_VERSION"));
    info!("Server: {}", config.server_url);

    let editor_key = match config.editor_key.take() {
        Some(key) => key,
        None => {
            let stdin = io::stdin();
            match prompt_editor_key(&mut stdin.lock(), &mut io::stdout())? {
                Some(key) => key,
                None => bail!("No editor key given"),
            }
        }
    };

    let engine = NativeEngine::load(&config.engine_library)
        .with_context(|| format!("Failed to load {}", config.engine_library))?;
    let client = WavePlotClient::new(&config.server_url, editor_key)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after current files");
                cancel.cancel();
            }
        }
    });

    let (event_tx, mut event_rx) = mpsc::channel(100);
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                PipelineEvent::Progress { processed, total } if total > 0 => {
                    println!("{:.1}%", processed as f64 * 100.0 / total as f64);
                }
                PipelineEvent::StateChanged(PipelineState::Done) => println!("Done!"),
                PipelineEvent::StateChanged(PipelineState::Cancelled) => println!("Cancelled."),
                _ => {}
            }
        }
    });

    let started = Utc::now();
    let pipeline = Pipeline::with_events(config.pipeline_config(), event_tx);
    let stats = pipeline
        .run(&config.directory, Arc::new(engine), client, cancel)
        .await?;

    // Pipeline (and its sender) is gone; the printer drains and ends
    drop(pipeline);
    printer.await?;

    println!("{}", stats);
    info!("Finished in {}s", (Utc::now() - started).num_seconds());

    Ok(())
}
