use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::InputConfig;

/// Configuration for one recording session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier, used for log correlation.
    pub session_id: String,

    /// Destination WAV path. Truncated when the session starts.
    pub destination: PathBuf,

    /// Sample rate (downstream STT expects 16 kHz)
    pub sample_rate: u32,

    /// Number of channels (1 = mono)
    pub channels: u16,

    /// Interval of the elapsed-time and waveform tickers.
    pub tick_interval: Duration,
}

impl SessionConfig {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            ..Self::default()
        }
    }

    /// The capture format this session records in.
    pub fn input_config(&self) -> InputConfig {
        InputConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
            ..InputConfig::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("memo-{}", uuid::Uuid::new_v4()),
            destination: PathBuf::from("recording.wav"),
            sample_rate: 16000, // LINEAR16 for speech-to-text
            channels: 1,        // Mono
            tick_interval: Duration::from_millis(100),
        }
    }
}
