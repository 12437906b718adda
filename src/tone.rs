use rodio::Source;
use std::f32::consts::TAU;
use std::time::Duration;

/// Sample rate used for synthesized tones.
pub const TONE_SAMPLE_RATE: u32 = 48_000;

pub const DEFAULT_FREQUENCY_HZ: f32 = 600.0;
pub const DEFAULT_DECAY_FLOOR: f32 = 0.001;

/// Pitch and envelope of a tone.
///
/// The gain starts at `volume` and decays exponentially to
/// `volume * decay_floor` over the tone's duration, so tone edges don't click.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneShape {
    pub frequency_hz: f32,
    pub volume: f32,
    pub decay_floor: f32,
}

impl ToneShape {
    /// Gain at `progress` (0.0 = onset, 1.0 = end of tone).
    pub fn gain_at(&self, progress: f32) -> f32 {
        let floor = self.decay_floor.clamp(f32::MIN_POSITIVE, 1.0);
        self.volume * floor.powf(progress.clamp(0.0, 1.0))
    }
}

impl Default for ToneShape {
    fn default() -> Self {
        ToneShape {
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            volume: 1.0,
            decay_floor: DEFAULT_DECAY_FLOOR,
        }
    }
}

/// A finite mono sine tone with the decay envelope applied.
pub struct ToneSource {
    shape: ToneShape,
    sample_rate: u32,
    total_samples: usize,
    pos: usize,
}

impl ToneSource {
    pub fn new(shape: ToneShape, duration: Duration) -> Self {
        ToneSource::with_sample_rate(shape, duration, TONE_SAMPLE_RATE)
    }

    pub fn with_sample_rate(shape: ToneShape, duration: Duration, sample_rate: u32) -> Self {
        let sample_rate = sample_rate.max(1);
        let total_samples = (duration.as_secs_f64() * sample_rate as f64).round() as usize;
        ToneSource {
            shape,
            sample_rate,
            total_samples,
            pos: 0,
        }
    }
}

impl Iterator for ToneSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.pos >= self.total_samples {
            return None;
        }
        let t = self.pos as f32 / self.sample_rate as f32;
        let progress = self.pos as f32 / self.total_samples as f32;
        let sample = (TAU * self.shape.frequency_hz * t).sin() * self.shape.gain_at(progress);
        self.pos += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total_samples - self.pos;
        (remaining, Some(remaining))
    }
}

impl Source for ToneSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.pos)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        let nanos = self.total_samples as u64 * 1_000_000_000 / u64::from(self.sample_rate);
        Some(Duration::from_nanos(nanos))
    }
}
