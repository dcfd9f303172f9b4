use std::sync::{Arc, Mutex};

/// Number of points in a waveform envelope. The rendering consumer lays out
/// exactly this many bars, so the length is a hard invariant.
pub const ENVELOPE_LEN: usize = 50;

/// Floor amplitude. Segments with no samples (and silence-adjacent ones)
/// render as a thin baseline rather than disappearing.
pub const ENVELOPE_FLOOR: f32 = 0.1;

/// Ceiling amplitude for a full-scale sample.
pub const ENVELOPE_CEIL: f32 = 0.9;

/// A fixed-length amplitude envelope with every value in
/// [`ENVELOPE_FLOOR`, `ENVELOPE_CEIL`].
pub type WaveformEnvelope = [f32; ENVELOPE_LEN];

/// An envelope before any audio has arrived: all points at the floor.
pub fn silent_envelope() -> WaveformEnvelope {
    [ENVELOPE_FLOOR; ENVELOPE_LEN]
}

/// Compute the amplitude envelope of one PCM16LE frame.
///
/// The valid sample pairs are partitioned into [`ENVELOPE_LEN`] equal-width
/// segments. Each segment averages `0.1 + 0.8 * |sample| / 32768` over its
/// decoded samples; segments with no samples yield the floor value, which
/// keeps the output length fixed regardless of input size. Deterministic and
/// side-effect free. An odd trailing byte is ignored.
pub fn compute_envelope(pcm: &[u8]) -> WaveformEnvelope {
    let mut envelope = silent_envelope();

    let sample_count = pcm.len() / 2;
    if sample_count == 0 {
        return envelope;
    }

    let samples_per_segment = (sample_count / ENVELOPE_LEN).max(1);

    for (idx, point) in envelope.iter_mut().enumerate() {
        let start = idx * samples_per_segment;
        let end = ((idx + 1) * samples_per_segment).min(sample_count);
        if start >= end {
            // Past the end of a short frame: leave the floor value.
            continue;
        }

        let mut sum = 0.0f64;
        for sample_idx in start..end {
            let lo = pcm[sample_idx * 2];
            let hi = pcm[sample_idx * 2 + 1];
            let sample = i16::from_le_bytes([lo, hi]);
            let normalized = (sample as i32).unsigned_abs() as f64 / 32768.0;
            sum += 0.1 + 0.8 * normalized;
        }

        *point = (sum / (end - start) as f64) as f32;
    }

    envelope
}

/// The single shared slot holding the most recent envelope.
///
/// Written by the capture thread after every frame, read by the UI waveform
/// tick. Both sides copy: the writer replaces the slot wholesale and the
/// reader snapshots it, so neither ever observes a partial envelope and the
/// lock is never held across I/O.
#[derive(Clone)]
pub struct SharedEnvelope {
    slot: Arc<Mutex<WaveformEnvelope>>,
}

impl SharedEnvelope {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(silent_envelope())),
        }
    }

    /// Replace the slot with a freshly computed envelope (capture side).
    pub fn publish(&self, envelope: WaveformEnvelope) {
        *self.slot.lock().unwrap() = envelope;
    }

    /// Snapshot the latest envelope (rendering side). Returns the silent
    /// envelope until the first frame arrives.
    pub fn snapshot(&self) -> WaveformEnvelope {
        *self.slot.lock().unwrap()
    }

    /// Reset to the silent envelope.
    pub fn clear(&self) {
        *self.slot.lock().unwrap() = silent_envelope();
    }
}

impl Default for SharedEnvelope {
    fn default() -> Self {
        Self::new()
    }
}
