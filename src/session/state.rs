use serde::{Deserialize, Serialize};

/// Lifecycle state of a recording session.
///
/// Exactly one value is active per session. All transitions go through the
/// controller, which consults [`RecordingState::can_transition`] and rejects
/// anything that is not an outgoing edge of the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordingState {
    /// Initial state; no file has been opened yet.
    NotStarted,
    /// Capture thread running, frames streaming to disk.
    Recording,
    /// Hardware input released, tickers cancelled, file still open.
    Paused,
    /// File finalized; a valid WAV artifact exists. Re-enterable.
    Stopped,
    /// Finalized file handed to the playback collaborator.
    Playing,
    /// Finalized file handed to the speech-to-text collaborator.
    Converting,
}

impl RecordingState {
    /// Whether `self -> to` is an edge of the session state machine.
    ///
    /// NotStarted -> Recording -> {Paused <-> Recording} -> Stopped
    /// -> {Playing -> Stopped, Converting -> Stopped}. There is no terminal
    /// state; a fresh recording cycle requires a fresh session because the
    /// destination file is truncated on open.
    pub fn can_transition(self, to: RecordingState) -> bool {
        use RecordingState::*;
        matches!(
            (self, to),
            (NotStarted, Recording)
                | (Recording, Paused)
                | (Recording, Stopped)
                | (Paused, Recording)
                | (Paused, Stopped)
                | (Stopped, Playing)
                | (Stopped, Converting)
                | (Playing, Stopped)
                | (Converting, Stopped)
        )
    }

    /// True while the session owns live capture resources.
    pub fn is_capturing(self) -> bool {
        self == RecordingState::Recording
    }
}

impl std::fmt::Display for RecordingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RecordingState::NotStarted => "not-started",
            RecordingState::Recording => "recording",
            RecordingState::Paused => "paused",
            RecordingState::Stopped => "stopped",
            RecordingState::Playing => "playing",
            RecordingState::Converting => "converting",
        };
        f.write_str(name)
    }
}
