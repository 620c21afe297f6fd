//! Audio normalization
//!
//! Decodes an arbitrary audio byte buffer (WAV or MP3 container) into the
//! canonical mono 16 kHz f32 waveform the transcriber expects.

use talkback_core::{DecodeError, NormalizedAudio, CANONICAL_SAMPLE_RATE};

use crate::wav;

/// Input frames per resampler call.
const RESAMPLE_CHUNK: usize = 1024;

/// Below this many input samples the FFT resampler is not worth setting up.
const LINEAR_RESAMPLE_THRESHOLD: usize = 64;

/// Decodes compressed or raw audio into a normalized waveform.
pub struct AudioNormalizer;

impl AudioNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Decode `bytes` into a mono 16 kHz waveform in [-1.0, 1.0].
    ///
    /// An empty buffer deterministically yields an empty waveform without
    /// touching any decoder. Unrecognized or corrupt containers are
    /// request-level failures, reported as `DecodeError`.
    pub fn normalize(&self, bytes: &[u8]) -> Result<NormalizedAudio, DecodeError> {
        if bytes.is_empty() {
            return Ok(NormalizedAudio::empty());
        }

        let (samples, sample_rate, channels) = if bytes.starts_with(b"RIFF") {
            let decoded = wav::decode(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;
            (decoded.samples, decoded.sample_rate, decoded.channels as usize)
        } else {
            decode_mp3(bytes)?
        };

        let mono = downmix(&samples, channels);
        let resampled = resample(&mono, sample_rate)?;

        tracing::debug!(
            input_bytes = bytes.len(),
            source_rate = sample_rate,
            source_channels = channels,
            output_samples = resampled.len(),
            "normalized audio"
        );

        Ok(NormalizedAudio::new(resampled))
    }
}

impl Default for AudioNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode an MP3 stream into interleaved samples.
fn decode_mp3(bytes: &[u8]) -> Result<(Vec<f32>, u32, usize), DecodeError> {
    use minimp3::{Decoder, Error, Frame};

    let mut decoder = Decoder::new(std::io::Cursor::new(bytes));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;
    let mut channels = 0usize;

    loop {
        match decoder.next_frame() {
            Ok(Frame {
                data,
                sample_rate: rate,
                channels: frame_channels,
                ..
            }) => {
                if sample_rate == 0 {
                    sample_rate = rate as u32;
                    channels = frame_channels;
                }
                samples.extend(data.iter().map(|&s| s as f32 / 32768.0));
            }
            Err(Error::Eof) => break,
            Err(Error::SkippedData) => continue,
            Err(Error::InsufficientData) => break,
            Err(e) => return Err(DecodeError::Malformed(e.to_string())),
        }
    }

    if samples.is_empty() {
        return Err(DecodeError::UnrecognizedFormat);
    }

    Ok((samples, sample_rate, channels))
}

/// Average interleaved channels down to mono.
fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Resample mono audio to the canonical rate.
fn resample(input: &[f32], source_rate: u32) -> Result<Vec<f32>, DecodeError> {
    use rubato::{FftFixedIn, Resampler};

    if source_rate == CANONICAL_SAMPLE_RATE || input.is_empty() {
        return Ok(input.to_vec());
    }

    if input.len() < LINEAR_RESAMPLE_THRESHOLD {
        return Ok(resample_linear(input, source_rate));
    }

    let mut resampler = FftFixedIn::<f64>::new(
        source_rate as usize,
        CANONICAL_SAMPLE_RATE as usize,
        RESAMPLE_CHUNK,
        2,
        1,
    )
    .map_err(|e| DecodeError::Resample(e.to_string()))?;

    let mut output = Vec::with_capacity(
        (input.len() as u64 * CANONICAL_SAMPLE_RATE as u64 / source_rate as u64) as usize + 1,
    );
    let mut pos = 0;

    while pos < input.len() {
        let needed = resampler.input_frames_next();
        let mut chunk = vec![0.0f64; needed];
        let take = (input.len() - pos).min(needed);
        for (dst, src) in chunk.iter_mut().zip(&input[pos..pos + take]) {
            *dst = *src as f64;
        }
        pos += take;

        let frames = resampler
            .process(&[chunk], None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;
        output.extend(frames[0].iter().map(|&s| s as f32));
    }

    Ok(output)
}

/// Linear interpolation for inputs too short for the FFT resampler.
fn resample_linear(input: &[f32], source_rate: u32) -> Vec<f32> {
    let ratio = CANONICAL_SAMPLE_RATE as f64 / source_rate as f64;
    let output_len = (input.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_idx = i as f64 / ratio;
        let idx_floor = src_idx.floor() as usize;
        let idx_ceil = (idx_floor + 1).min(input.len().saturating_sub(1));
        let frac = (src_idx - idx_floor as f64) as f32;

        let sample = input[idx_floor] * (1.0 - frac) + input[idx_ceil] * frac;
        output.push(sample);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav;

    fn sine(len: usize, step: f32) -> Vec<f32> {
        (0..len).map(|i| (i as f32 * step).sin() * 0.5).collect()
    }

    #[test]
    fn test_empty_bytes_yield_empty_waveform() {
        let normalizer = AudioNormalizer::new();
        let audio = normalizer.normalize(&[]).unwrap();
        assert!(audio.is_empty());

        // Deterministic: same result every time.
        let again = normalizer.normalize(&[]).unwrap();
        assert_eq!(audio, again);
    }

    #[test]
    fn test_wav_at_canonical_rate_passes_through() {
        let samples = sine(1600, 0.05);
        let bytes = wav::encode_pcm16(&samples, CANONICAL_SAMPLE_RATE).unwrap();

        let audio = AudioNormalizer::new().normalize(&bytes).unwrap();
        assert_eq!(audio.len(), samples.len());
        assert_eq!(audio.sample_rate(), CANONICAL_SAMPLE_RATE);
    }

    #[test]
    fn test_wav_is_resampled_to_canonical_rate() {
        let samples = sine(48_000, 0.01);
        let bytes = wav::encode_pcm16(&samples, 48_000).unwrap();

        let audio = AudioNormalizer::new().normalize(&bytes).unwrap();
        // 48k -> 16k: a third of the samples, within resampler latency and
        // tail padding.
        let expected = samples.len() / 3;
        assert!(
            (audio.len() as i64 - expected as i64).abs() <= 2 * RESAMPLE_CHUNK as i64,
            "got {}, expected about {}",
            audio.len(),
            expected
        );
    }

    #[test]
    fn test_samples_stay_in_range() {
        let samples = sine(8_000, 0.02);
        let bytes = wav::encode_pcm16(&samples, 8_000).unwrap();

        let audio = AudioNormalizer::new().normalize(&bytes).unwrap();
        assert!(audio.samples().iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_garbage_is_unrecognized() {
        let result = AudioNormalizer::new().normalize(&[0u8; 32]);
        assert!(matches!(result, Err(DecodeError::UnrecognizedFormat)));
    }

    #[test]
    fn test_truncated_wav_is_malformed() {
        let result = AudioNormalizer::new().normalize(b"RIFFxxxx");
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_downmix_averages_channels() {
        let interleaved = vec![1.0, 0.0, 1.0, 0.0];
        assert_eq!(downmix(&interleaved, 2), vec![0.5, 0.5]);
    }

    #[test]
    fn test_linear_resample_short_input() {
        let out = resample(&[0.0, 1.0], 8_000).unwrap();
        assert_eq!(out.len(), 4);
    }
}
