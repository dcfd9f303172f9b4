use std::collections::VecDeque;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, StreamConfig};
use tracing::{error, info, warn};

use super::input::{AudioInput, InputConfig};
use crate::error::AudioError;

/// How long a read waits for the device before reporting a transient fault.
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Fallback minimum buffer when the platform does not report one: 50 ms at
/// the target rate.
const DEFAULT_MIN_BUFFER_BYTES: usize = 1600;

/// Microphone input backed by cpal.
///
/// cpal pushes native-format buffers from an OS callback and its stream
/// handle is not `Send`, so the stream is owned by a dedicated thread spawned
/// in `open`. The callback converts each buffer to 16 kHz mono i16 and
/// forwards it over a channel; `read` drains that channel with blocking pull
/// semantics. `close` tears the stream thread down; `open` after `close`
/// builds a fresh stream on the same device selection (the resume path).
pub struct MicrophoneInput {
    config: InputConfig,
    min_buffer_bytes: usize,
    samples: Option<mpsc::Receiver<Vec<i16>>>,
    shutdown: Option<mpsc::Sender<()>>,
    stream_thread: Option<JoinHandle<()>>,
    pending: VecDeque<u8>,
}

impl MicrophoneInput {
    pub fn new(config: InputConfig) -> Self {
        Self {
            config,
            min_buffer_bytes: DEFAULT_MIN_BUFFER_BYTES,
            samples: None,
            shutdown: None,
            stream_thread: None,
            pending: VecDeque::new(),
        }
    }
}

impl AudioInput for MicrophoneInput {
    fn open(&mut self) -> Result<(), AudioError> {
        if self.samples.is_some() {
            return Ok(());
        }

        let (sample_tx, sample_rx) = mpsc::channel::<Vec<i16>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<usize, AudioError>>();
        let target = self.config;

        let thread = std::thread::Builder::new()
            .name("mic-stream".to_string())
            .spawn(move || run_stream_thread(target, sample_tx, shutdown_rx, ready_tx))
            .map_err(AudioError::Io)?;

        // The stream thread reports either a running stream or the open error.
        let outcome = ready_rx
            .recv_timeout(Duration::from_secs(5))
            .map_err(|_| AudioError::DeviceUnavailable("audio stream did not start".into()))?;

        match outcome {
            Ok(min_buffer_bytes) => {
                self.min_buffer_bytes = min_buffer_bytes;
                self.samples = Some(sample_rx);
                self.shutdown = Some(shutdown_tx);
                self.stream_thread = Some(thread);
                Ok(())
            }
            Err(e) => {
                let _ = thread.join();
                Err(e)
            }
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, AudioError> {
        let samples = self
            .samples
            .as_ref()
            .ok_or_else(|| AudioError::DeviceUnavailable("microphone is not open".into()))?;

        // Block until the device delivers at least one buffer, then drain
        // whatever else already arrived to fill the frame.
        if self.pending.is_empty() {
            let batch = match samples.recv_timeout(READ_TIMEOUT) {
                Ok(batch) => batch,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    return Err(AudioError::DeviceUnavailable(
                        "no audio from device within read timeout".into(),
                    ))
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(AudioError::DeviceUnavailable("audio stream ended".into()))
                }
            };
            for sample in batch {
                self.pending.extend(sample.to_le_bytes());
            }
        }
        while self.pending.len() < buf.len() {
            match samples.try_recv() {
                Ok(batch) => {
                    for sample in batch {
                        self.pending.extend(sample.to_le_bytes());
                    }
                }
                Err(_) => break,
            }
        }

        let mut n = self.pending.len().min(buf.len());
        n -= n % 2;
        for byte in buf.iter_mut().take(n) {
            *byte = self.pending.pop_front().unwrap();
        }
        Ok(n)
    }

    fn close(&mut self) {
        self.samples = None;
        self.pending.clear();
        // Dropping the shutdown sender disconnects the stream thread's
        // control channel, which ends its park and drops the stream.
        self.shutdown = None;
        if let Some(thread) = self.stream_thread.take() {
            if thread.join().is_err() {
                warn!("Microphone stream thread panicked during shutdown");
            }
        }
    }

    fn min_buffer_bytes(&self) -> usize {
        self.min_buffer_bytes
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

impl Drop for MicrophoneInput {
    fn drop(&mut self) {
        self.close();
    }
}

/// Owns the cpal stream for the lifetime of one open/close cycle.
fn run_stream_thread(
    target: InputConfig,
    sample_tx: mpsc::Sender<Vec<i16>>,
    shutdown_rx: mpsc::Receiver<()>,
    ready_tx: mpsc::Sender<Result<usize, AudioError>>,
) {
    let stream = match build_stream(target, sample_tx) {
        Ok((stream, min_buffer_bytes)) => {
            let _ = ready_tx.send(Ok(min_buffer_bytes));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    // Park until close() drops the shutdown sender.
    let _ = shutdown_rx.recv();
    drop(stream);
}

fn build_stream(
    target: InputConfig,
    sample_tx: mpsc::Sender<Vec<i16>>,
) -> Result<(cpal::Stream, usize), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| AudioError::DeviceUnavailable("no input device found".into()))?;

    info!(
        "Using audio input device: {}",
        device.name().unwrap_or_else(|_| "unknown".to_string())
    );

    let supported = device
        .default_input_config()
        .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

    let sample_format = supported.sample_format();
    let native_rate = supported.sample_rate().0;
    let native_channels = supported.channels();
    let stream_config: StreamConfig = supported.into();

    info!(
        "Audio config: {} Hz, {} channels, {:?}",
        native_rate, native_channels, sample_format
    );

    let convert = move |data_i16: Vec<i16>| {
        let mono = interleaved_to_mono(&data_i16, native_channels);
        decimate(mono, native_rate, target.sample_rate)
    };

    let stream = match sample_format {
        SampleFormat::I16 => {
            build_stream_typed::<i16>(&device, &stream_config, sample_tx, convert)?
        }
        SampleFormat::U16 => {
            build_stream_typed::<u16>(&device, &stream_config, sample_tx, convert)?
        }
        SampleFormat::F32 => {
            build_stream_typed::<f32>(&device, &stream_config, sample_tx, convert)?
        }
        _ => {
            return Err(AudioError::DeviceUnavailable(format!(
                "unsupported sample format {:?}",
                sample_format
            )))
        }
    };

    stream
        .play()
        .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

    // Report the platform's fixed buffer size when it has one; otherwise the
    // 50 ms default stands.
    let min_buffer_bytes = match stream_config.buffer_size {
        cpal::BufferSize::Fixed(frames) => {
            let scaled = frames as u64 * target.sample_rate as u64 / native_rate.max(1) as u64;
            (scaled as usize * 2).max(2)
        }
        cpal::BufferSize::Default => DEFAULT_MIN_BUFFER_BYTES,
    };

    Ok((stream, min_buffer_bytes))
}

fn build_stream_typed<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_tx: mpsc::Sender<Vec<i16>>,
    convert: impl Fn(Vec<i16>) -> Vec<i16> + Send + 'static,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::SizedSample + Send + 'static,
    i16: FromSample<T>,
{
    let err_fn = |err| error!("Audio stream error: {}", err);

    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let as_i16: Vec<i16> = data.iter().map(|&s| i16::from_sample(s)).collect();
                let batch = convert(as_i16);
                if !batch.is_empty() {
                    // Receiver gone means the handle closed mid-callback.
                    let _ = sample_tx.send(batch);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

    Ok(stream)
}

/// Collapse interleaved frames to mono by summing channels with clipping.
fn interleaved_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    let mut mono = Vec::with_capacity(samples.len() / channels);
    for frame in samples.chunks_exact(channels) {
        let sum: i32 = frame.iter().map(|&s| s as i32).sum();
        mono.push(sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
    }
    mono
}

/// Downsample by decimation. Upsampling is not attempted: a device slower
/// than the target rate passes through unchanged.
fn decimate(samples: Vec<i16>, from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate <= to_rate || to_rate == 0 {
        return samples;
    }

    let ratio = (from_rate / to_rate) as usize;
    if ratio <= 1 {
        return samples;
    }

    samples.into_iter().step_by(ratio).collect()
}
