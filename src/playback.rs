use std::path::Path;
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::info;

use crate::audio::AudioFile;
use crate::error::AudioError;

/// The decode-and-play collaborator for finalized recordings.
///
/// `play` resolves when playback reaches its natural end or `stop` is
/// called; the session controller uses that resolution to transition back to
/// Stopped. Implementations wrap whatever media primitive the host platform
/// provides.
#[async_trait::async_trait]
pub trait Playback: Send + Sync {
    async fn play(&self, path: &Path) -> Result<(), AudioError>;

    /// Interrupt an in-flight `play`. No-op when nothing is playing.
    async fn stop(&self);
}

/// Headless playback stand-in that paces on the clip's real duration.
///
/// Decodes the finalized WAV to learn its length and sleeps it off, honoring
/// `stop`. Keeps session timing and completion semantics testable without an
/// output device; device output belongs to the host platform's media layer.
pub struct TimedPlayer {
    interrupt: Arc<Notify>,
}

impl TimedPlayer {
    pub fn new() -> Self {
        Self {
            interrupt: Arc::new(Notify::new()),
        }
    }
}

impl Default for TimedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Playback for TimedPlayer {
    async fn play(&self, path: &Path) -> Result<(), AudioError> {
        let clip = AudioFile::open(path)?;
        let duration = std::time::Duration::from_secs_f64(clip.duration_seconds);

        info!(
            "Playback started: {} ({:.1}s)",
            path.display(),
            clip.duration_seconds
        );

        tokio::select! {
            _ = tokio::time::sleep(duration) => {
                info!("Playback finished: {}", path.display());
            }
            _ = self.interrupt.notified() => {
                info!("Playback interrupted: {}", path.display());
            }
        }

        Ok(())
    }

    async fn stop(&self) {
        self.interrupt.notify_waiters();
    }
}
