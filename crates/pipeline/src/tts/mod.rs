//! Text-to-speech
//!
//! A narrow backend contract plus the `Synthesizer` wrapper that owns the
//! lazily-initialized backend handle and assembles the final WAV payload.

mod http;

pub use http::HttpTtsBackend;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use talkback_config::TtsConfig;
use talkback_core::{SynthesisError, CANONICAL_SAMPLE_RATE};

use crate::wav;

/// Length of the silent fallback clip, in milliseconds.
const SILENCE_MS: u32 = 300;

/// Raw synthesized speech as produced by a backend.
pub struct RawSpeech {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Narrow contract over a text-to-speech engine.
#[async_trait]
pub trait TtsBackend: Send + Sync {
    /// Synthesize text into mono speech samples.
    async fn synthesize(&self, text: &str) -> Result<RawSpeech, SynthesisError>;

    /// Human-readable backend name.
    fn name(&self) -> &str;
}

type BackendFactory =
    Box<dyn Fn() -> Result<Arc<dyn TtsBackend>, SynthesisError> + Send + Sync>;

/// Converts assistant text into a 16-bit PCM mono WAV byte buffer.
///
/// Empty or whitespace text produces a short, syntactically valid silent clip
/// without touching the backend; a failed turn must still be answerable with
/// some audio.
pub struct Synthesizer {
    backend: OnceCell<Arc<dyn TtsBackend>>,
    factory: BackendFactory,
}

impl Synthesizer {
    /// Synthesizer backed by the configured OpenAI-compatible HTTP endpoint.
    pub fn new(config: &TtsConfig) -> Self {
        let factory_config = config.clone();
        Self {
            backend: OnceCell::new(),
            factory: Box::new(move || {
                Ok(Arc::new(HttpTtsBackend::new(&factory_config)) as Arc<dyn TtsBackend>)
            }),
        }
    }

    /// Synthesizer over a pre-built backend (used by tests).
    pub fn with_backend(config: &TtsConfig, backend: Arc<dyn TtsBackend>) -> Self {
        let synthesizer = Self::new(config);
        synthesizer
            .backend
            .set(backend)
            .unwrap_or_else(|_| unreachable!("fresh OnceCell"));
        synthesizer
    }

    /// Synthesize `text` into WAV bytes.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        if text.trim().is_empty() {
            return self.silence();
        }

        let backend = self
            .backend
            .get_or_try_init(|| async { (self.factory)() })
            .await?;

        let speech = backend.synthesize(text).await?;
        wav::encode_pcm16(&speech.samples, speech.sample_rate)
            .map_err(|e| SynthesisError::Encode(e.to_string()))
    }

    /// A short silent WAV clip, used when synthesis has nothing to say or
    /// nothing it can say.
    pub fn silence(&self) -> Result<Vec<u8>, SynthesisError> {
        let samples = vec![0.0f32; (CANONICAL_SAMPLE_RATE * SILENCE_MS / 1000) as usize];
        wav::encode_pcm16(&samples, CANONICAL_SAMPLE_RATE)
            .map_err(|e| SynthesisError::Encode(e.to_string()))
    }
}
