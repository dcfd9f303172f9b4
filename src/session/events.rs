use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::state::RecordingState;

/// Callback surface of a recording session.
///
/// Events are pushed to the UI layer over an unbounded channel rather than
/// inline closures, so the consumer decides its own scheduling and the
/// session never blocks on a slow renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Elapsed-time tick from the logical clock, every tick interval while
    /// recording.
    Tick { elapsed_secs: f64 },
    /// Latest amplitude envelope snapshot (always 50 points), every tick
    /// interval while recording.
    Waveform { envelope: Vec<f32> },
    /// The session moved to a new state.
    StateChanged { state: RecordingState },
    /// The WAV artifact was finalized with this payload size.
    Finalized { bytes: u64 },
    /// Finalize failed; `bytes` is what had been accumulated before the
    /// error. The partial recording is not silently dropped.
    FinalizeFailed { bytes: u64, error: String },
    /// Playback reached its natural end.
    PlaybackFinished,
    /// The speech-to-text collaborator produced a transcript.
    TranscriptReady { text: String },
    /// The speech-to-text collaborator failed.
    TranscriptFailed { error: String },
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Channel pair connecting a session to its UI consumer.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{silent_envelope, ENVELOPE_LEN};

    #[test]
    fn test_events_serialize_tagged() {
        let json = serde_json::to_string(&SessionEvent::Tick { elapsed_secs: 1.5 }).unwrap();
        assert!(json.contains("\"event\":\"tick\""));
        assert!(json.contains("1.5"));

        let json = serde_json::to_string(&SessionEvent::StateChanged {
            state: RecordingState::Recording,
        })
        .unwrap();
        assert!(json.contains("state_changed"));
    }

    #[test]
    fn test_waveform_event_round_trips() {
        let event = SessionEvent::Waveform {
            envelope: silent_envelope().to_vec(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: SessionEvent = serde_json::from_str(&json).unwrap();
        match back {
            SessionEvent::Waveform { envelope } => assert_eq!(envelope.len(), ENVELOPE_LEN),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
