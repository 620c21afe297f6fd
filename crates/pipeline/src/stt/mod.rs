//! Speech-to-text
//!
//! A narrow backend contract plus the `Transcriber` wrapper that owns the
//! lazily-initialized, process-wide backend handle.

mod http;
#[cfg(feature = "local-whisper")]
mod local_whisper;

pub use http::HttpSttBackend;
#[cfg(feature = "local-whisper")]
pub use local_whisper::LocalWhisperBackend;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use talkback_config::SttConfig;
use talkback_core::{NormalizedAudio, TranscriptionError};

/// Narrow contract over a speech-recognition engine.
#[async_trait]
pub trait SttBackend: Send + Sync {
    /// Transcribe a normalized waveform; `language` pins the output language,
    /// auto-detected when `None`.
    async fn transcribe(
        &self,
        audio: &NormalizedAudio,
        language: Option<&str>,
    ) -> Result<String, TranscriptionError>;

    /// Human-readable backend name.
    fn name(&self) -> &str;
}

type BackendFactory =
    Box<dyn Fn() -> Result<Arc<dyn SttBackend>, TranscriptionError> + Send + Sync>;

/// Converts normalized audio to text.
///
/// The backend handle is constructed lazily on first real use, exactly once
/// per process (model load is expensive), and shared across all requests.
pub struct Transcriber {
    backend: OnceCell<Arc<dyn SttBackend>>,
    factory: BackendFactory,
    forced_language: Option<String>,
}

impl Transcriber {
    /// Transcriber over the configured backend.
    ///
    /// With the `local-whisper` feature enabled and `stt.model_path` set, the
    /// in-process whisper.cpp backend is used; otherwise the HTTP backend.
    pub fn new(config: &SttConfig) -> Self {
        let factory_config = config.clone();
        Self {
            backend: OnceCell::new(),
            factory: Box::new(move || build_backend(&factory_config)),
            forced_language: config.language.clone(),
        }
    }

    /// Transcriber over a pre-built backend (used by tests).
    pub fn with_backend(config: &SttConfig, backend: Arc<dyn SttBackend>) -> Self {
        let transcriber = Self::new(config);
        transcriber
            .backend
            .set(backend)
            .unwrap_or_else(|_| unreachable!("fresh OnceCell"));
        transcriber
    }

    /// Transcribe a waveform into plain text.
    ///
    /// Empty input yields empty text deterministically, without initializing
    /// or calling the backend. The configured forced language wins over the
    /// caller-supplied one.
    pub async fn transcribe(
        &self,
        audio: &NormalizedAudio,
        language: Option<&str>,
    ) -> Result<String, TranscriptionError> {
        if audio.is_empty() {
            return Ok(String::new());
        }

        let language = self.forced_language.as_deref().or(language);

        let backend = self
            .backend
            .get_or_try_init(|| async { (self.factory)() })
            .await?;

        let text = backend.transcribe(audio, language).await?;
        Ok(text.trim().to_string())
    }
}

fn build_backend(config: &SttConfig) -> Result<Arc<dyn SttBackend>, TranscriptionError> {
    #[cfg(feature = "local-whisper")]
    if let Some(ref model_path) = config.model_path {
        return Ok(Arc::new(LocalWhisperBackend::new(model_path)?));
    }

    Ok(Arc::new(HttpSttBackend::new(config)))
}
