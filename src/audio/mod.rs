pub mod capture;
pub mod envelope;
pub mod file;
pub mod input;
pub mod microphone;
pub mod wav;

pub use capture::CaptureWorker;
pub use envelope::{
    compute_envelope, silent_envelope, SharedEnvelope, WaveformEnvelope, ENVELOPE_CEIL,
    ENVELOPE_FLOOR, ENVELOPE_LEN,
};
pub use file::AudioFile;
pub use input::{AudioInput, InputConfig, ToneInput};
pub use microphone::MicrophoneInput;
pub use wav::WavFileWriter;
