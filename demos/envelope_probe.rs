// Prints the 50-point amplitude envelope of a WAV file, segment by segment.
//
// Run with: cargo run --example envelope_probe -- path/to/clip.wav

use anyhow::{Context, Result};
use voicenote::{compute_envelope, AudioFile};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let path = std::env::args()
        .nth(1)
        .context("usage: envelope_probe <clip.wav>")?;

    let audio = AudioFile::open(&path)?;
    let pcm: Vec<u8> = audio.samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    let envelope = compute_envelope(&pcm);

    println!(
        "{} ({:.1}s, {} Hz, {} ch)",
        audio.path, audio.duration_seconds, audio.sample_rate, audio.channels
    );
    for (i, point) in envelope.iter().enumerate() {
        let width = ((point - 0.1) / 0.8 * 60.0).round() as usize;
        println!("{:2} {:.3} {}", i, point, "#".repeat(width));
    }

    Ok(())
}
