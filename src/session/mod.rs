//! Recording session management
//!
//! This module provides the `RecorderSession` abstraction that manages:
//! - The background PCM capture worker and its cooperative cancellation
//! - Incremental WAV writing and finalize-on-stop
//! - Elapsed-time and waveform tickers feeding the UI event channel
//! - The start/pause/resume/stop/play/convert state machine

mod config;
mod events;
mod session;
mod state;
mod stats;
mod ticker;

pub use config::SessionConfig;
pub use events::{event_channel, EventReceiver, EventSender, SessionEvent};
pub use session::RecorderSession;
pub use state::RecordingState;
pub use stats::SessionStats;
pub use ticker::Ticker;
