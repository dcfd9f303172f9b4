use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use super::envelope::{compute_envelope, SharedEnvelope};
use super::input::AudioInput;
use super::wav::WavFileWriter;

/// Consecutive read failures tolerated before the device is treated as gone.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 8;

/// The PCM capture loop.
///
/// Owns the hardware input handle for the duration of one recording run and
/// executes on a dedicated blocking thread: reads one fixed-size frame per
/// iteration, appends it to the shared WAV writer, derives the amplitude
/// envelope and publishes it to the shared slot. Cancellation is cooperative:
/// the stop flag is observed every iteration, so stopping takes effect within
/// at most one frame-read interval.
pub struct CaptureWorker {
    input: Box<dyn AudioInput>,
    writer: Arc<Mutex<WavFileWriter>>,
    envelope: SharedEnvelope,
    stop: Arc<AtomicBool>,
}

impl CaptureWorker {
    pub fn new(
        input: Box<dyn AudioInput>,
        writer: Arc<Mutex<WavFileWriter>>,
        envelope: SharedEnvelope,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            input,
            writer,
            envelope,
            stop,
        }
    }

    /// Run the capture loop until the stop flag is raised, then close the
    /// device and hand the input handle back to the controller.
    pub fn run(mut self) -> Box<dyn AudioInput> {
        // Frames are twice the platform-reported minimum buffer to absorb
        // scheduling jitter.
        let frame_bytes = (self.input.min_buffer_bytes() * 2).max(2);
        let mut frame = vec![0u8; frame_bytes];
        let mut consecutive_errors = 0u32;

        info!(
            "Capture loop started: {} ({} byte frames)",
            self.input.name(),
            frame_bytes
        );

        loop {
            if self.stop.load(Ordering::SeqCst) {
                break;
            }

            let n = match self.input.read(&mut frame) {
                Ok(n) => {
                    consecutive_errors = 0;
                    n
                }
                Err(e) => {
                    // Dropping one frame must not abort an in-progress
                    // recording; only a persistently failing device does.
                    consecutive_errors += 1;
                    if consecutive_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                        error!("Capture read failing persistently, stopping: {}", e);
                        break;
                    }
                    warn!("Capture read error, frame skipped: {}", e);
                    continue;
                }
            };

            // A read that completed after cancellation is dropped so an
            // immediate start->stop leaves the file with zero payload.
            if self.stop.load(Ordering::SeqCst) {
                break;
            }

            if n == 0 {
                continue;
            }

            {
                let mut writer = self.writer.lock().unwrap();
                if let Err(e) = writer.append(&frame[..n]) {
                    error!("Failed to append captured frame, stopping: {}", e);
                    break;
                }
            }

            self.envelope.publish(compute_envelope(&frame[..n]));
        }

        self.input.close();
        info!("Capture loop stopped");

        self.input
    }
}
