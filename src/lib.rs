pub mod audio;
pub mod config;
pub mod error;
pub mod playback;
pub mod session;
pub mod transcribe;

pub use audio::{
    compute_envelope, silent_envelope, AudioFile, AudioInput, CaptureWorker, InputConfig,
    MicrophoneInput, SharedEnvelope, ToneInput, WaveformEnvelope, WavFileWriter, ENVELOPE_LEN,
};
pub use config::Config;
pub use error::AudioError;
pub use playback::{Playback, TimedPlayer};
pub use session::{
    event_channel, EventReceiver, EventSender, RecorderSession, RecordingState, SessionConfig,
    SessionEvent, SessionStats,
};
pub use transcribe::SpeechToText;
