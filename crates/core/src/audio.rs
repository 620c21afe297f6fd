//! Audio buffer types

/// Sample rate every waveform is normalized to before transcription (Hz).
pub const CANONICAL_SAMPLE_RATE: u32 = 16_000;

/// A decoded, mono, 16 kHz waveform with samples in [-1.0, 1.0].
///
/// Exists only within one request; produced by the audio normalizer and
/// consumed by the transcriber.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAudio {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl NormalizedAudio {
    /// Wrap already-normalized samples.
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples,
            sample_rate: CANONICAL_SAMPLE_RATE,
        }
    }

    /// A zero-length waveform.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_waveform() {
        let audio = NormalizedAudio::empty();
        assert!(audio.is_empty());
        assert_eq!(audio.len(), 0);
        assert_eq!(audio.sample_rate(), CANONICAL_SAMPLE_RATE);
    }

    #[test]
    fn test_duration() {
        let audio = NormalizedAudio::new(vec![0.0; 16_000]);
        assert!((audio.duration_secs() - 1.0).abs() < f32::EPSILON);
    }
}
