// End-to-end session walkthrough against the synthetic tone input:
// record -> pause -> resume -> stop -> play, with live event logging.
//
// Run with: cargo run --example live_session

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;
use voicenote::{
    event_channel, AudioInput, RecorderSession, SessionConfig, SessionEvent, TimedPlayer,
    ToneInput,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let dir = std::env::temp_dir();
    let config = SessionConfig::new(dir.join("voicenote-demo.wav"));

    let input: Box<dyn AudioInput> = Box::new(ToneInput::new(config.input_config()));
    let (events_tx, mut events_rx) = event_channel();
    let session = Arc::new(RecorderSession::new(config, input, events_tx));

    // Render a coarse ASCII waveform on every envelope tick.
    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                SessionEvent::Waveform { envelope } => {
                    let bars: String = envelope
                        .iter()
                        .map(|&p| match (p * 10.0) as u32 {
                            0..=2 => '_',
                            3..=5 => '=',
                            _ => '#',
                        })
                        .collect();
                    info!("waveform [{}]", bars);
                }
                SessionEvent::Tick { elapsed_secs } => info!("elapsed {:.1}s", elapsed_secs),
                other => info!("event: {:?}", other),
            }
        }
    });

    info!("Recording 2s of tone...");
    session.start(true).await?;
    tokio::time::sleep(Duration::from_secs(2)).await;

    info!("Pausing for 1s...");
    session.pause().await?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    info!("Resuming for 1s...");
    session.resume().await?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    let stats = session.stop().await?;
    info!(
        "Recorded {:.1}s ({} bytes) to {}",
        stats.elapsed_secs,
        stats.bytes_written,
        stats.destination.display()
    );

    info!("Playing the memo back...");
    session.play(Arc::new(TimedPlayer::new())).await?;
    while session.state().await == voicenote::RecordingState::Playing {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    drop(session);
    printer.await.ok();

    Ok(())
}
