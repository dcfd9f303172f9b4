// Integration tests for the recording session controller.
//
// These drive full sessions against the synthetic tone input: state machine
// guards, pause/resume elapsed-time preservation, concurrent waveform reads,
// immediate stop, playback hand-off and transcription hand-off.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tempfile::TempDir;
use tokio::time::timeout;
use voicenote::{
    event_channel, AudioError, AudioFile, EventReceiver, RecorderSession, RecordingState,
    SessionConfig, SessionEvent, SpeechToText, TimedPlayer, ToneInput, ENVELOPE_LEN,
};

fn make_session(
    dir: &TempDir,
    name: &str,
    min_buffer: Duration,
) -> (Arc<RecorderSession>, EventReceiver, PathBuf) {
    let destination = dir.path().join(format!("{name}.wav"));
    let config = SessionConfig::new(&destination);
    let input = ToneInput::with_min_buffer(config.input_config(), min_buffer);

    let (events_tx, events_rx) = event_channel();
    let session = Arc::new(RecorderSession::new(config, Box::new(input), events_tx));
    (session, events_rx, destination)
}

async fn wait_for_event(
    events: &mut EventReceiver,
    pred: impl Fn(&SessionEvent) -> bool,
) -> SessionEvent {
    timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Some(event) if pred(&event) => return event,
                Some(_) => continue,
                None => panic!("event channel closed while waiting"),
            }
        }
    })
    .await
    .expect("timed out waiting for session event")
}

fn wav_header_sizes(path: &Path) -> (u32, u32) {
    let bytes = std::fs::read(path).unwrap();
    assert!(bytes.len() >= 44);
    let riff = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    let data = u32::from_le_bytes(bytes[40..44].try_into().unwrap());
    (riff, data)
}

struct FakeStt {
    fail: bool,
}

#[async_trait::async_trait]
impl SpeechToText for FakeStt {
    async fn transcribe(&self, path: &Path) -> Result<String> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if self.fail {
            anyhow::bail!("transcription backend offline");
        }
        Ok(format!("transcript of {}", path.display()))
    }
}

#[tokio::test]
async fn test_start_without_permission_stays_not_started() {
    let dir = TempDir::new().unwrap();
    let (session, _events, destination) =
        make_session(&dir, "no-permission", Duration::from_millis(10));

    let result = session.start(false).await;
    assert!(matches!(result, Err(AudioError::PermissionDenied)));
    assert_eq!(session.state().await, RecordingState::NotStarted);
    assert!(!destination.exists(), "no file may be created");
}

#[tokio::test]
async fn test_transitions_rejected_outside_edges() {
    let dir = TempDir::new().unwrap();
    let (session, _events, _path) = make_session(&dir, "edges", Duration::from_millis(10));

    // Nothing but start is legal from NotStarted.
    assert!(matches!(
        session.pause().await,
        Err(AudioError::InvalidTransition { .. })
    ));
    assert!(matches!(
        session.resume().await,
        Err(AudioError::InvalidTransition { .. })
    ));
    assert!(matches!(
        session.stop().await,
        Err(AudioError::InvalidTransition { .. })
    ));
    assert!(matches!(
        session.play(Arc::new(TimedPlayer::new())).await,
        Err(AudioError::InvalidTransition { .. })
    ));
    assert!(matches!(
        session.convert(Arc::new(FakeStt { fail: false })).await,
        Err(AudioError::InvalidTransition { .. })
    ));

    session.start(true).await.unwrap();

    // A second start on a live session is rejected.
    assert!(matches!(
        session.start(true).await,
        Err(AudioError::InvalidTransition { .. })
    ));
    // Resume only applies to a paused session.
    assert!(matches!(
        session.resume().await,
        Err(AudioError::InvalidTransition { .. })
    ));

    session.stop().await.unwrap();

    // Stopped only reaches Playing/Converting; recording is over.
    assert!(matches!(
        session.pause().await,
        Err(AudioError::InvalidTransition { .. })
    ));
    assert!(matches!(
        session.start(true).await,
        Err(AudioError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_recording_produces_audio_and_envelope() {
    let dir = TempDir::new().unwrap();
    let (session, mut events, destination) =
        make_session(&dir, "basic", Duration::from_millis(10));

    session.start(true).await.unwrap();
    assert_eq!(session.state().await, RecordingState::Recording);

    wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::StateChanged { state: RecordingState::Recording })
    })
    .await;

    tokio::time::sleep(Duration::from_millis(400)).await;

    // The live envelope reflects the non-silent tone.
    let envelope = session.waveform();
    assert_eq!(envelope.len(), ENVELOPE_LEN);
    assert!(envelope.iter().any(|&p| p > 0.11));

    // Ticks and waveform events are flowing.
    wait_for_event(&mut events, |e| matches!(e, SessionEvent::Tick { .. })).await;
    wait_for_event(&mut events, |e| matches!(e, SessionEvent::Waveform { .. })).await;

    let stats = session.stop().await.unwrap();
    assert_eq!(stats.state, RecordingState::Stopped);
    assert!(stats.bytes_written > 0);
    assert!(stats.elapsed_secs > 0.0);

    match wait_for_event(&mut events, |e| matches!(e, SessionEvent::Finalized { .. })).await {
        SessionEvent::Finalized { bytes } => assert_eq!(bytes, stats.bytes_written),
        other => panic!("unexpected event {other:?}"),
    }

    // The artifact decodes and matches the reported byte count.
    let audio = AudioFile::open(&destination).unwrap();
    assert_eq!(audio.samples.len() as u64 * 2, stats.bytes_written);
    assert!(audio.samples.iter().any(|&s| s != 0));
}

#[tokio::test]
async fn test_immediate_stop_yields_valid_zero_data_wav() {
    let dir = TempDir::new().unwrap();
    // A long frame interval: the first read is still in flight at stop time.
    let (session, _events, destination) =
        make_session(&dir, "immediate", Duration::from_millis(200));

    session.start(true).await.unwrap();
    let stats = session.stop().await.unwrap();

    assert_eq!(stats.bytes_written, 0);
    let (riff, data) = wav_header_sizes(&destination);
    assert_eq!(riff, 36);
    assert_eq!(data, 0);
}

#[tokio::test]
async fn test_pause_resume_preserves_elapsed_time() {
    let dir = TempDir::new().unwrap();
    let (session, _events, destination) =
        make_session(&dir, "pause-resume", Duration::from_millis(10));

    let first_leg = Instant::now();
    session.start(true).await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    session.pause().await.unwrap();
    let first_leg = first_leg.elapsed();

    assert_eq!(session.state().await, RecordingState::Paused);
    let elapsed_at_pause = session.elapsed_secs();
    assert!(elapsed_at_pause > 0.0);

    // The logical clock is frozen while paused.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(session.elapsed_secs(), elapsed_at_pause);

    let second_leg = Instant::now();
    session.resume().await.unwrap();
    assert_eq!(session.state().await, RecordingState::Recording);
    tokio::time::sleep(Duration::from_millis(400)).await;
    let stats = session.stop().await.unwrap();
    let second_leg = second_leg.elapsed();

    // Elapsed time counts recording legs only, never the pause.
    assert!(stats.elapsed_secs > elapsed_at_pause);
    let recorded_wall = (first_leg + second_leg).as_secs_f64();
    assert!(
        (stats.elapsed_secs - recorded_wall).abs() < 0.4,
        "elapsed {:.2}s vs recorded wall {:.2}s",
        stats.elapsed_secs,
        recorded_wall
    );

    // Byte count is consistent with the elapsed time at 32000 bytes/sec.
    let audio_secs = stats.bytes_written as f64 / 32000.0;
    assert!(
        (audio_secs - stats.elapsed_secs).abs() < 0.4,
        "audio {:.2}s vs elapsed {:.2}s",
        audio_secs,
        stats.elapsed_secs
    );

    // Both legs landed in one file.
    let audio = AudioFile::open(&destination).unwrap();
    assert_eq!(audio.samples.len() as u64 * 2, stats.bytes_written);
}

#[tokio::test]
async fn test_concurrent_waveform_reads_never_torn() {
    let dir = TempDir::new().unwrap();
    let (session, _events, _path) =
        make_session(&dir, "concurrent", Duration::from_millis(5));

    session.start(true).await.unwrap();

    let mut readers = Vec::new();
    for _ in 0..100 {
        let session = Arc::clone(&session);
        readers.push(tokio::spawn(async move {
            for _ in 0..20 {
                let envelope = session.waveform();
                assert_eq!(envelope.len(), ENVELOPE_LEN);
                for &point in &envelope {
                    assert!(
                        (0.1..=0.9).contains(&point),
                        "torn or out-of-range point {point}"
                    );
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    for reader in readers {
        reader.await.unwrap();
    }

    session.stop().await.unwrap();
}

#[tokio::test]
async fn test_playback_returns_to_stopped_on_completion() {
    let dir = TempDir::new().unwrap();
    let (session, mut events, _path) =
        make_session(&dir, "playback", Duration::from_millis(10));

    session.start(true).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.stop().await.unwrap();

    session.play(Arc::new(TimedPlayer::new())).await.unwrap();
    assert_eq!(session.state().await, RecordingState::Playing);

    // While playing, recording and a second playback are rejected.
    assert!(matches!(
        session.play(Arc::new(TimedPlayer::new())).await,
        Err(AudioError::InvalidTransition { .. })
    ));

    wait_for_event(&mut events, |e| matches!(e, SessionEvent::PlaybackFinished)).await;
    assert_eq!(session.state().await, RecordingState::Stopped);
}

#[tokio::test]
async fn test_stop_playback_interrupts() {
    let dir = TempDir::new().unwrap();
    let (session, mut events, _path) =
        make_session(&dir, "playback-stop", Duration::from_millis(10));

    session.start(true).await.unwrap();
    // Enough audio that natural completion would take seconds.
    tokio::time::sleep(Duration::from_millis(2500)).await;
    session.stop().await.unwrap();

    session.play(Arc::new(TimedPlayer::new())).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let interrupted = Instant::now();
    session.stop_playback().await.unwrap();
    wait_for_event(&mut events, |e| matches!(e, SessionEvent::PlaybackFinished)).await;

    assert!(interrupted.elapsed() < Duration::from_secs(2));
    assert_eq!(session.state().await, RecordingState::Stopped);
}

#[tokio::test]
async fn test_convert_emits_transcript_and_returns_to_stopped() {
    let dir = TempDir::new().unwrap();
    let (session, mut events, destination) =
        make_session(&dir, "convert", Duration::from_millis(10));

    session.start(true).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.stop().await.unwrap();

    session.convert(Arc::new(FakeStt { fail: false })).await.unwrap();
    assert_eq!(session.state().await, RecordingState::Converting);

    match wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::TranscriptReady { .. })
    })
    .await
    {
        SessionEvent::TranscriptReady { text } => {
            assert!(text.contains(&destination.display().to_string()));
        }
        other => panic!("unexpected event {other:?}"),
    }

    wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::StateChanged { state: RecordingState::Stopped })
    })
    .await;
    assert_eq!(session.state().await, RecordingState::Stopped);
}

#[tokio::test]
async fn test_convert_failure_still_returns_to_stopped() {
    let dir = TempDir::new().unwrap();
    let (session, mut events, _path) =
        make_session(&dir, "convert-fail", Duration::from_millis(10));

    session.start(true).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.stop().await.unwrap();

    session.convert(Arc::new(FakeStt { fail: true })).await.unwrap();

    match wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::TranscriptFailed { .. })
    })
    .await
    {
        SessionEvent::TranscriptFailed { error } => {
            assert!(error.contains("offline"));
        }
        other => panic!("unexpected event {other:?}"),
    }

    wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::StateChanged { state: RecordingState::Stopped })
    })
    .await;
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let (session, _events, destination) =
        make_session(&dir, "shutdown", Duration::from_millis(10));

    session.start(true).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    session.shutdown().await;
    assert_eq!(session.state().await, RecordingState::Stopped);

    // Tearing down again, and with nothing running, is a no-op.
    session.shutdown().await;
    session.shutdown().await;

    // The artifact was finalized by the first shutdown.
    let (riff, data) = wav_header_sizes(&destination);
    assert_eq!(riff, 36 + data);
}

#[tokio::test]
async fn test_tick_events_accumulate_logical_time() {
    let dir = TempDir::new().unwrap();
    let (session, mut events, _path) = make_session(&dir, "ticks", Duration::from_millis(10));

    session.start(true).await.unwrap();

    let mut last = 0.0;
    for _ in 0..3 {
        match wait_for_event(&mut events, |e| matches!(e, SessionEvent::Tick { .. })).await {
            SessionEvent::Tick { elapsed_secs } => {
                assert!(elapsed_secs > last, "ticks must be monotonic");
                last = elapsed_secs;
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    // Logical clock granularity is the tick interval (100 ms).
    let tenths = last * 10.0;
    assert!((tenths - tenths.round()).abs() < 1e-6);

    session.stop().await.unwrap();
}
