use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use voicenote::{
    event_channel, AudioFile, AudioInput, Config, MicrophoneInput, Playback, RecorderSession,
    SessionConfig, SessionEvent, TimedPlayer, ToneInput,
};

#[derive(Parser)]
#[command(name = "voicenote", about = "Voice memo capture and WAV encoding core")]
struct Cli {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/voicenote")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a memo from the microphone
    Record {
        /// Destination WAV path; defaults to a timestamped file in the
        /// configured recordings directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Recording length in seconds
        #[arg(long, default_value_t = 5)]
        seconds: u64,

        /// Use the synthetic tone source instead of the microphone
        #[arg(long)]
        tone: bool,

        /// Print session events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Inspect a finalized WAV recording
    Info { path: PathBuf },

    /// Play a finalized recording (headless timed playback)
    Play { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    match cli.command {
        Command::Record {
            output,
            seconds,
            tone,
            json,
        } => record(&cfg, output, seconds, tone, json).await,
        Command::Info { path } => info_command(&path),
        Command::Play { path } => play(&path).await,
    }
}

async fn record(
    cfg: &Config,
    output: Option<PathBuf>,
    seconds: u64,
    tone: bool,
    json: bool,
) -> Result<()> {
    let destination = match output {
        Some(path) => path,
        None => {
            std::fs::create_dir_all(&cfg.storage.recordings_dir)
                .context("Failed to create recordings directory")?;
            let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
            PathBuf::from(&cfg.storage.recordings_dir).join(format!("memo-{stamp}.wav"))
        }
    };

    let session_config = SessionConfig {
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        tick_interval: Duration::from_millis(cfg.audio.tick_interval_ms),
        ..SessionConfig::new(destination)
    };
    let input_config = session_config.input_config();

    let input: Box<dyn AudioInput> = if tone {
        Box::new(ToneInput::new(input_config))
    } else {
        Box::new(MicrophoneInput::new(input_config))
    };

    let (events_tx, mut events_rx) = event_channel();
    let session = Arc::new(RecorderSession::new(session_config, input, events_tx));

    // Relay session events: one elapsed-time line per second, everything as
    // JSON when asked.
    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if json {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::warn!("Failed to encode event: {}", e),
                }
                continue;
            }
            match event {
                SessionEvent::Tick { elapsed_secs }
                    if (elapsed_secs * 10.0).round() as u64 % 10 == 0 =>
                {
                    info!("Recording... {:.0}s", elapsed_secs);
                }
                SessionEvent::Finalized { bytes } => info!("Finalized: {} bytes", bytes),
                SessionEvent::FinalizeFailed { bytes, error } => {
                    tracing::error!("Finalize failed after {} bytes: {}", bytes, error)
                }
                _ => {}
            }
        }
    });

    session.start(true).await?;
    tokio::time::sleep(Duration::from_secs(seconds)).await;
    let stats = session.stop().await?;

    info!(
        "Saved {} ({:.1}s, {} bytes)",
        stats.destination.display(),
        stats.elapsed_secs,
        stats.bytes_written
    );

    drop(session);
    printer.await.ok();
    Ok(())
}

fn info_command(path: &std::path::Path) -> Result<()> {
    let audio = AudioFile::open(path)?;

    info!("Path: {}", audio.path);
    info!("Duration: {:.2}s", audio.duration_seconds);
    info!("Sample rate: {} Hz", audio.sample_rate);
    info!("Channels: {}", audio.channels);
    info!("Samples: {}", audio.samples.len());

    Ok(())
}

async fn play(path: &std::path::Path) -> Result<()> {
    let player = TimedPlayer::new();
    player.play(path).await?;
    Ok(())
}
