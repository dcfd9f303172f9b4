use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::config::SessionConfig;
use super::events::{EventSender, SessionEvent};
use super::state::RecordingState;
use super::stats::SessionStats;
use super::ticker::Ticker;
use crate::audio::{AudioInput, CaptureWorker, SharedEnvelope, WavFileWriter};
use crate::error::AudioError;
use crate::playback::Playback;
use crate::transcribe::SpeechToText;

/// A recording session: orchestrates the capture worker, the WAV writer and
/// the periodic UI tickers through the start/pause/resume/stop/play/convert
/// lifecycle.
///
/// All mutable capture state lives in fields of this instance (no
/// process-wide statics), so independent sessions and tests never
/// cross-contaminate. The hardware input handle is owned by the capture
/// worker while recording and parked here otherwise; the output file handle
/// is owned for the whole session lifetime.
pub struct RecorderSession {
    config: SessionConfig,

    /// When the session object was created
    started_at: DateTime<Utc>,

    /// Event channel to the UI layer
    events: EventSender,

    /// Current lifecycle state; every transition goes through this lock
    state: Arc<Mutex<RecordingState>>,

    /// Cooperative stop flag observed by the capture loop every iteration
    stop_flag: Arc<AtomicBool>,

    /// Logical clock: number of elapsed-time ticks so far. Survives
    /// pause/resume, so elapsed time accumulates only while recording.
    ticks: Arc<AtomicU64>,

    /// Latest waveform envelope, shared with the capture worker
    envelope: SharedEnvelope,

    /// Incremental WAV writer, shared with the capture worker
    writer: Arc<StdMutex<WavFileWriter>>,

    /// Hardware input handle, parked between capture runs
    input: Mutex<Option<Box<dyn AudioInput>>>,

    /// Running capture worker, if any
    capture: Mutex<Option<JoinHandle<Box<dyn AudioInput>>>>,

    /// Elapsed-time and waveform tickers while recording
    tickers: Mutex<Vec<Ticker>>,

    /// Active playback collaborator while in the Playing state
    playback: Arc<Mutex<Option<Arc<dyn Playback>>>>,
}

impl RecorderSession {
    pub fn new(config: SessionConfig, input: Box<dyn AudioInput>, events: EventSender) -> Self {
        info!("Creating recording session: {}", config.session_id);

        let writer = WavFileWriter::new(&config.input_config());

        Self {
            config,
            started_at: Utc::now(),
            events,
            state: Arc::new(Mutex::new(RecordingState::NotStarted)),
            stop_flag: Arc::new(AtomicBool::new(false)),
            ticks: Arc::new(AtomicU64::new(0)),
            envelope: SharedEnvelope::new(),
            writer: Arc::new(StdMutex::new(writer)),
            input: Mutex::new(Some(input)),
            capture: Mutex::new(None),
            tickers: Mutex::new(Vec::new()),
            playback: Arc::new(Mutex::new(None)),
        }
    }

    /// Start recording. Legal only from NotStarted; a fresh recording cycle
    /// needs a fresh session because the destination is truncated here.
    ///
    /// Failure to open the device or the destination aborts the transition
    /// and leaves the session in NotStarted.
    pub async fn start(&self, permission_granted: bool) -> Result<(), AudioError> {
        let mut state = self.state.lock().await;
        if *state != RecordingState::NotStarted {
            return Err(AudioError::InvalidTransition {
                from: *state,
                to: RecordingState::Recording,
            });
        }

        if !permission_granted {
            warn!("Recording rejected: microphone permission not granted");
            return Err(AudioError::PermissionDenied);
        }

        // Device first: if it fails nothing has touched the filesystem.
        let mut input = self.input.lock().await.take().ok_or_else(|| {
            AudioError::DeviceUnavailable("input handle is not parked".to_string())
        })?;
        if let Err(e) = input.open() {
            *self.input.lock().await = Some(input);
            return Err(e);
        }

        if let Err(e) = self.writer.lock().unwrap().open(&self.config.destination) {
            input.close();
            *self.input.lock().await = Some(input);
            return Err(e);
        }

        self.spawn_capture(input).await;
        self.start_tickers().await;

        info!(
            "Recording started: {} -> {}",
            self.config.session_id,
            self.config.destination.display()
        );

        self.set_state(&mut state, RecordingState::Recording);
        Ok(())
    }

    /// Pause recording: release the hardware input and cancel both tickers.
    ///
    /// There is no portable hardware pause primitive, so this is a
    /// stop-without-finalize; elapsed time and bytes written are preserved.
    pub async fn pause(&self) -> Result<(), AudioError> {
        let mut state = self.state.lock().await;
        if *state != RecordingState::Recording {
            return Err(AudioError::InvalidTransition {
                from: *state,
                to: RecordingState::Paused,
            });
        }

        self.halt_capture().await;
        self.cancel_tickers().await;

        info!(
            "Recording paused at {:.1}s: {}",
            self.elapsed_secs(),
            self.config.session_id
        );

        self.set_state(&mut state, RecordingState::Paused);
        Ok(())
    }

    /// Resume a paused recording: reopen the hardware input and restart the
    /// tickers from the preserved elapsed time.
    pub async fn resume(&self) -> Result<(), AudioError> {
        let mut state = self.state.lock().await;
        if *state != RecordingState::Paused {
            return Err(AudioError::InvalidTransition {
                from: *state,
                to: RecordingState::Recording,
            });
        }

        let mut input = self.input.lock().await.take().ok_or_else(|| {
            AudioError::DeviceUnavailable("input handle is not parked".to_string())
        })?;
        if let Err(e) = input.open() {
            // Stay Paused; the caller may retry.
            *self.input.lock().await = Some(input);
            return Err(e);
        }

        self.spawn_capture(input).await;
        self.start_tickers().await;

        info!(
            "Recording resumed at {:.1}s: {}",
            self.elapsed_secs(),
            self.config.session_id
        );

        self.set_state(&mut state, RecordingState::Recording);
        Ok(())
    }

    /// Stop recording and finalize the WAV artifact.
    ///
    /// The capture worker is joined before the header is patched, so the
    /// byte count is final. Finalize failures are reported on the event
    /// channel with the accumulated byte count; the session still reaches
    /// Stopped so the partial recording remains addressable.
    pub async fn stop(&self) -> Result<SessionStats, AudioError> {
        let mut state = self.state.lock().await;
        if !matches!(
            *state,
            RecordingState::Recording | RecordingState::Paused
        ) {
            return Err(AudioError::InvalidTransition {
                from: *state,
                to: RecordingState::Stopped,
            });
        }

        self.halt_capture().await;
        self.cancel_tickers().await;

        let finalize_result = self.writer.lock().unwrap().finalize();
        match finalize_result {
            Ok(bytes) => {
                info!(
                    "Recording stopped: {} ({} bytes, {:.1}s)",
                    self.config.session_id,
                    bytes,
                    self.elapsed_secs()
                );
                self.emit(SessionEvent::Finalized { bytes });
            }
            Err(e) => {
                let bytes = self.writer.lock().unwrap().bytes_written();
                error!("Failed to finalize recording: {}", e);
                self.emit(SessionEvent::FinalizeFailed {
                    bytes,
                    error: e.to_string(),
                });
            }
        }

        self.set_state(&mut state, RecordingState::Stopped);
        Ok(self.snapshot_stats(*state))
    }

    /// Hand the finalized file to the playback collaborator. On natural
    /// completion the session transitions back to Stopped by itself and
    /// emits `PlaybackFinished`.
    pub async fn play(&self, player: Arc<dyn Playback>) -> Result<(), AudioError> {
        let mut state = self.state.lock().await;
        if *state != RecordingState::Stopped {
            return Err(AudioError::InvalidTransition {
                from: *state,
                to: RecordingState::Playing,
            });
        }

        self.set_state(&mut state, RecordingState::Playing);
        *self.playback.lock().await = Some(Arc::clone(&player));

        let path = self.config.destination.clone();
        let session_state = Arc::clone(&self.state);
        let playback_slot = Arc::clone(&self.playback);
        let events = self.events.clone();

        tokio::spawn(async move {
            if let Err(e) = player.play(&path).await {
                warn!("Playback failed: {}", e);
            }

            let mut state = session_state.lock().await;
            if *state == RecordingState::Playing {
                *state = RecordingState::Stopped;
                let _ = events.send(SessionEvent::StateChanged {
                    state: RecordingState::Stopped,
                });
            }
            drop(state);

            let _ = events.send(SessionEvent::PlaybackFinished);
            *playback_slot.lock().await = None;
        });

        Ok(())
    }

    /// Interrupt an in-flight playback. The completion task performs the
    /// Playing -> Stopped transition.
    pub async fn stop_playback(&self) -> Result<(), AudioError> {
        let state = self.state.lock().await;
        if *state != RecordingState::Playing {
            return Err(AudioError::InvalidTransition {
                from: *state,
                to: RecordingState::Stopped,
            });
        }
        let player = self.playback.lock().await.clone();
        drop(state);

        if let Some(player) = player {
            player.stop().await;
        }
        Ok(())
    }

    /// Hand the finalized file to the speech-to-text collaborator and await
    /// its result asynchronously. The session transitions back to Stopped
    /// when the result (success or failure) arrives.
    pub async fn convert(&self, stt: Arc<dyn SpeechToText>) -> Result<(), AudioError> {
        let mut state = self.state.lock().await;
        if *state != RecordingState::Stopped {
            return Err(AudioError::InvalidTransition {
                from: *state,
                to: RecordingState::Converting,
            });
        }

        self.set_state(&mut state, RecordingState::Converting);

        let path = self.config.destination.clone();
        let session_state = Arc::clone(&self.state);
        let events = self.events.clone();

        tokio::spawn(async move {
            match stt.transcribe(&path).await {
                Ok(text) => {
                    info!("Transcript ready ({} chars)", text.len());
                    let _ = events.send(SessionEvent::TranscriptReady { text });
                }
                Err(e) => {
                    warn!("Transcription failed: {}", e);
                    let _ = events.send(SessionEvent::TranscriptFailed {
                        error: e.to_string(),
                    });
                }
            }

            let mut state = session_state.lock().await;
            if *state == RecordingState::Converting {
                *state = RecordingState::Stopped;
                let _ = events.send(SessionEvent::StateChanged {
                    state: RecordingState::Stopped,
                });
            }
        });

        Ok(())
    }

    /// Screen-teardown path: stop an active recording and cancel the
    /// tickers. Safe to call in any state, any number of times.
    pub async fn shutdown(&self) {
        let current = *self.state.lock().await;
        if matches!(current, RecordingState::Recording | RecordingState::Paused) {
            if let Err(e) = self.stop().await {
                warn!("Shutdown stop failed: {}", e);
            }
        }
        self.cancel_tickers().await;
    }

    pub async fn state(&self) -> RecordingState {
        *self.state.lock().await
    }

    /// Elapsed recording time from the logical clock, in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.ticks.load(Ordering::SeqCst) as f64 * self.config.tick_interval.as_secs_f64()
    }

    /// Latest waveform envelope snapshot.
    pub fn waveform(&self) -> crate::audio::WaveformEnvelope {
        self.envelope.snapshot()
    }

    pub async fn stats(&self) -> SessionStats {
        let state = *self.state.lock().await;
        self.snapshot_stats(state)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn spawn_capture(&self, input: Box<dyn AudioInput>) {
        self.stop_flag.store(false, Ordering::SeqCst);

        let worker = CaptureWorker::new(
            input,
            Arc::clone(&self.writer),
            self.envelope.clone(),
            Arc::clone(&self.stop_flag),
        );
        let handle = tokio::task::spawn_blocking(move || worker.run());

        *self.capture.lock().await = Some(handle);
    }

    /// Raise the stop flag, join the capture worker and park the returned
    /// input handle. Joining before finalize is what keeps the byte count
    /// stable.
    async fn halt_capture(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);

        if let Some(handle) = self.capture.lock().await.take() {
            match handle.await {
                Ok(input) => *self.input.lock().await = Some(input),
                Err(e) => error!("Capture worker panicked: {}", e),
            }
        }
    }

    async fn start_tickers(&self) {
        let period = self.config.tick_interval;
        let secs_per_tick = period.as_secs_f64();

        let ticks = Arc::clone(&self.ticks);
        let events = self.events.clone();
        let elapsed = Ticker::spawn("elapsed-time", period, move || {
            let n = ticks.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = events.send(SessionEvent::Tick {
                elapsed_secs: n as f64 * secs_per_tick,
            });
        });

        let envelope = self.envelope.clone();
        let events = self.events.clone();
        let waveform = Ticker::spawn("waveform", period, move || {
            let _ = events.send(SessionEvent::Waveform {
                envelope: envelope.snapshot().to_vec(),
            });
        });

        let mut tickers = self.tickers.lock().await;
        tickers.push(elapsed);
        tickers.push(waveform);
    }

    /// Cancel both tickers. No-op when none are running.
    async fn cancel_tickers(&self) {
        let mut tickers = std::mem::take(&mut *self.tickers.lock().await);
        for ticker in tickers.iter_mut() {
            ticker.cancel().await;
        }
    }

    fn set_state(
        &self,
        state: &mut tokio::sync::MutexGuard<'_, RecordingState>,
        to: RecordingState,
    ) {
        **state = to;
        self.emit(SessionEvent::StateChanged { state: to });
    }

    fn snapshot_stats(&self, state: RecordingState) -> SessionStats {
        SessionStats {
            session_id: self.config.session_id.clone(),
            started_at: self.started_at,
            state,
            elapsed_secs: self.elapsed_secs(),
            bytes_written: self.writer.lock().unwrap().bytes_written(),
            destination: self.config.destination.clone(),
        }
    }

    fn emit(&self, event: SessionEvent) {
        // A dropped receiver means the UI is gone; the session keeps going.
        let _ = self.events.send(event);
    }
}

impl Drop for RecorderSession {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Ok(mut tickers) = self.tickers.try_lock() {
            for ticker in tickers.iter_mut() {
                ticker.abort();
            }
        }
        // The writer's own Drop patches the header best-effort.
    }
}
