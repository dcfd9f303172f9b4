use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::input::InputConfig;
use crate::error::AudioError;

/// Incremental WAV file writer.
///
/// `open` truncates/creates the destination and writes the 44-byte header
/// with provisional zero sizes; `append` streams raw PCM16LE payload bytes;
/// `finalize` patches the RIFF size (offset 4) and data size (offset 40)
/// fields with the accumulated byte count and releases the handle. The file
/// is a valid WAV artifact only after `finalize`.
///
/// State contract: `append`/`finalize` before `open` fail with
/// `WriterNotOpen`; any use after `finalize` fails with `WriterClosed`, and
/// a second `finalize` never corrupts the already-patched header.
pub struct WavFileWriter {
    spec: hound::WavSpec,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: Option<PathBuf>,
    bytes_written: u64,
    finalized: bool,
}

impl WavFileWriter {
    /// A writer for the given capture format, not yet bound to a file.
    pub fn new(config: &InputConfig) -> Self {
        Self {
            spec: hound::WavSpec {
                channels: config.channels,
                sample_rate: config.sample_rate,
                bits_per_sample: config.bits_per_sample,
                sample_format: hound::SampleFormat::Int,
            },
            writer: None,
            path: None,
            bytes_written: 0,
            finalized: false,
        }
    }

    /// Create/truncate the destination and write the provisional header.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<(), AudioError> {
        if self.finalized {
            return Err(AudioError::WriterClosed);
        }
        if self.writer.is_some() {
            return Err(AudioError::Io(std::io::Error::other(
                "WAV writer is already open",
            )));
        }

        let path = path.as_ref();
        let writer = hound::WavWriter::create(path, self.spec)?;

        info!("WAV writer opened: {}", path.display());

        self.writer = Some(writer);
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// Append raw PCM16LE payload bytes.
    ///
    /// The payload must hold whole samples; an odd length violates the PCM16
    /// frame invariant and is rejected before anything is written.
    pub fn append(&mut self, pcm: &[u8]) -> Result<(), AudioError> {
        if self.finalized {
            return Err(AudioError::WriterClosed);
        }
        let writer = self.writer.as_mut().ok_or(AudioError::WriterNotOpen)?;

        if pcm.len() % 2 != 0 {
            return Err(AudioError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "PCM16 payload must have an even byte length",
            )));
        }

        for pair in pcm.chunks_exact(2) {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            writer.write_sample(sample)?;
        }

        self.bytes_written += pcm.len() as u64;
        Ok(())
    }

    /// Patch the header size fields and release the file handle.
    ///
    /// Returns the total payload byte count. After this call the header
    /// invariant holds: RIFF size = 36 + data size, data size = total bytes.
    pub fn finalize(&mut self) -> Result<u64, AudioError> {
        if self.finalized {
            return Err(AudioError::WriterClosed);
        }
        let writer = self.writer.take().ok_or(AudioError::WriterNotOpen)?;

        writer.finalize()?;
        self.finalized = true;

        info!(
            "WAV finalized: {} ({} payload bytes)",
            self.path.as_deref().unwrap_or(Path::new("?")).display(),
            self.bytes_written
        );

        Ok(self.bytes_written)
    }

    /// Total payload bytes appended so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Destination path, once opened.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl Drop for WavFileWriter {
    fn drop(&mut self) {
        // Best effort: a dropped mid-session writer still patches its header
        // so the partial recording is not lost as a zero-length artifact.
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
