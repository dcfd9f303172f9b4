use std::time::Duration;

use tracing::info;

use crate::error::AudioError;

/// Capture format configuration.
///
/// Downstream speech-to-text expects exactly 16 kHz mono LINEAR16, so these
/// defaults are also the only values the pipeline is exercised with.
#[derive(Debug, Clone, Copy)]
pub struct InputConfig {
    /// Target sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (1 = mono)
    pub channels: u16,
    /// Bits per sample
    pub bits_per_sample: u16,
}

impl InputConfig {
    /// Bytes consumed by one second of audio (sample_rate * block_align).
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.channels as u32 * (self.bits_per_sample as u32 / 8)
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            bits_per_sample: 16,
        }
    }
}

/// A raw microphone handle with blocking pull semantics.
///
/// The capture loop runs on a dedicated thread because `read` blocks for the
/// duration of one hardware buffer fill. Implementations must be reopenable:
/// pausing a session closes the device and resuming opens it again on the
/// same instance.
pub trait AudioInput: Send {
    /// Acquire the hardware device.
    ///
    /// Fails with `DeviceUnavailable` when no input device can be opened and
    /// `PermissionDenied` when the platform refuses microphone access.
    fn open(&mut self) -> Result<(), AudioError>;

    /// Blocking read of up to `buf.len()` bytes of PCM16LE audio.
    ///
    /// Returns the number of bytes written into `buf`. A return of 0 means
    /// the device produced an empty buffer; callers skip the frame and keep
    /// looping.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, AudioError>;

    /// Release the hardware device. Safe to call when already closed.
    fn close(&mut self);

    /// Platform-reported minimum buffer size in bytes. The capture loop
    /// reads frames of twice this size to absorb scheduling jitter.
    fn min_buffer_bytes(&self) -> usize;

    /// Input name for logging.
    fn name(&self) -> &str;
}

/// Deterministic sine-tone input for tests, demos and batch runs.
///
/// Paces reads in real time: each `read` sleeps for one frame duration and
/// then returns a full frame of synthesized samples, so a session driven by
/// this input produces byte counts consistent with its elapsed time.
pub struct ToneInput {
    config: InputConfig,
    freq_hz: f64,
    amplitude: f64,
    frame: Duration,
    min_buffer_bytes: usize,
    phase: u64,
    open: bool,
}

impl ToneInput {
    /// A 440 Hz tone with 50 ms minimum buffers (100 ms frames).
    pub fn new(config: InputConfig) -> Self {
        Self::with_min_buffer(config, Duration::from_millis(50))
    }

    /// Tone input with an explicit minimum buffer duration. Tests use short
    /// buffers to keep pause/resume scenarios fast.
    pub fn with_min_buffer(config: InputConfig, min_buffer: Duration) -> Self {
        let min_buffer_bytes =
            (config.byte_rate() as f64 * min_buffer.as_secs_f64()) as usize / 2 * 2;
        Self {
            config,
            freq_hz: 440.0,
            amplitude: 0.5,
            frame: min_buffer * 2,
            min_buffer_bytes: min_buffer_bytes.max(2),
            phase: 0,
            open: false,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }
}

impl AudioInput for ToneInput {
    fn open(&mut self) -> Result<(), AudioError> {
        info!(
            "Tone input opened ({}Hz tone, {}Hz sample rate)",
            self.freq_hz, self.config.sample_rate
        );
        self.open = true;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, AudioError> {
        if !self.open {
            return Err(AudioError::DeviceUnavailable(
                "tone input is not open".to_string(),
            ));
        }

        // Block for one frame interval, like a hardware buffer fill.
        std::thread::sleep(self.frame);

        let sample_count = buf.len() / 2;
        for (i, chunk) in buf.chunks_exact_mut(2).enumerate() {
            let t = (self.phase + i as u64) as f64 / self.config.sample_rate as f64;
            let value = (t * self.freq_hz * std::f64::consts::TAU).sin() * self.amplitude;
            let sample = (value * i16::MAX as f64) as i16;
            chunk.copy_from_slice(&sample.to_le_bytes());
        }
        self.phase += sample_count as u64;

        Ok(sample_count * 2)
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn min_buffer_bytes(&self) -> usize {
        self.min_buffer_bytes
    }

    fn name(&self) -> &str {
        "synthetic tone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_linear16() {
        let config = InputConfig::default();
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.channels, 1);
        assert_eq!(config.bits_per_sample, 16);
        assert_eq!(config.byte_rate(), 32000);
    }

    #[test]
    fn test_tone_input_requires_open() {
        let mut input = ToneInput::with_min_buffer(
            InputConfig::default(),
            Duration::from_millis(1),
        );
        let mut buf = [0u8; 64];

        assert!(input.read(&mut buf).is_err());

        input.open().unwrap();
        let n = input.read(&mut buf).unwrap();
        assert_eq!(n, 64);

        input.close();
        assert!(input.read(&mut buf).is_err());
    }

    #[test]
    fn test_tone_input_fills_full_frames() {
        let mut input = ToneInput::with_min_buffer(
            InputConfig::default(),
            Duration::from_millis(1),
        );
        input.open().unwrap();

        let frame_bytes = input.min_buffer_bytes() * 2;
        let mut buf = vec![0u8; frame_bytes];
        let n = input.read(&mut buf).unwrap();

        assert_eq!(n, frame_bytes);
        // A 440Hz tone at half amplitude is not silence.
        assert!(buf.iter().any(|&b| b != 0));
    }

    #[test]
    fn test_tone_input_phase_is_continuous() {
        let mut input = ToneInput::with_min_buffer(
            InputConfig::default(),
            Duration::from_millis(1),
        );
        input.open().unwrap();

        let mut first = [0u8; 32];
        let mut second = [0u8; 32];
        input.read(&mut first).unwrap();
        input.read(&mut second).unwrap();

        // Consecutive reads continue the waveform rather than restarting it.
        assert_ne!(first, second);
    }
}
