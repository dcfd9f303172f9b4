use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::RecordingState;

/// Snapshot of a recording session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Session identifier
    pub session_id: String,

    /// When the session object was created
    pub started_at: DateTime<Utc>,

    /// Current lifecycle state
    pub state: RecordingState,

    /// Recorded time from the logical clock, in seconds. Preserved across
    /// pause/resume.
    pub elapsed_secs: f64,

    /// PCM payload bytes written to the destination so far
    pub bytes_written: u64,

    /// Destination WAV path
    pub destination: PathBuf,
}
