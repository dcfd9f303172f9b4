use std::path::Path;

use anyhow::Result;

/// The external speech-to-text collaborator.
///
/// Takes a finalized 16 kHz mono LINEAR16 WAV and returns the recognized
/// text. Transport (REST, local model, message bus) is the implementer's
/// concern; the session controller only awaits the result and relays it on
/// the event channel.
#[async_trait::async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, path: &Path) -> Result<String>;
}
