use crate::session::RecordingState;

/// Errors surfaced by the capture and encoding pipeline.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// The hardware input could not be opened. Recoverable by retrying after
    /// a permission/hardware check.
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Microphone permission has not been granted.
    #[error("microphone permission denied")]
    PermissionDenied,

    /// File create/write/seek failure. Fatal to the current session.
    #[error("audio file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Contract violation: the writer was used before `open`.
    #[error("WAV writer is not open")]
    WriterNotOpen,

    /// Contract violation: the writer was used after `finalize`.
    #[error("WAV writer already finalized")]
    WriterClosed,

    /// The requested transition is not an outgoing edge of the current state.
    #[error("invalid session transition: {from} -> {to}")]
    InvalidTransition {
        from: RecordingState,
        to: RecordingState,
    },
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io) => AudioError::Io(io),
            other => AudioError::Io(std::io::Error::other(other)),
        }
    }
}
