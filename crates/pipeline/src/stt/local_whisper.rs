//! In-process speech-to-text via whisper.cpp

use std::sync::Arc;

use async_trait::async_trait;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use talkback_core::{NormalizedAudio, TranscriptionError};

use super::SttBackend;

/// Local Whisper backend using whisper.cpp via whisper-rs.
pub struct LocalWhisperBackend {
    ctx: Arc<WhisperContext>,
}

impl LocalWhisperBackend {
    /// Load a GGML Whisper model from disk (e.g. ggml-base.en.bin).
    pub fn new(model_path: &str) -> Result<Self, TranscriptionError> {
        tracing::info!(model_path, "loading Whisper model");
        let ctx = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
            .map_err(|e| {
                TranscriptionError::Init(format!("failed to load Whisper model '{model_path}': {e}"))
            })?;
        tracing::info!("Whisper model loaded");
        Ok(Self { ctx: Arc::new(ctx) })
    }
}

#[async_trait]
impl SttBackend for LocalWhisperBackend {
    async fn transcribe(
        &self,
        audio: &NormalizedAudio,
        language: Option<&str>,
    ) -> Result<String, TranscriptionError> {
        let samples = audio.samples().to_vec();
        let language = language.map(str::to_string);
        let ctx = Arc::clone(&self.ctx);

        // whisper.cpp is CPU-bound; keep it off the async executor.
        let text = tokio::task::spawn_blocking(move || -> Result<String, TranscriptionError> {
            let mut state = ctx
                .create_state()
                .map_err(|e| TranscriptionError::Backend(format!("whisper state: {e}")))?;

            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            if let Some(ref lang) = language {
                params.set_language(Some(lang));
            }
            params.set_print_progress(false);
            params.set_print_special(false);
            params.set_print_realtime(false);
            params.set_print_timestamps(false);
            params.set_single_segment(true);

            state
                .full(params, &samples)
                .map_err(|e| TranscriptionError::Backend(format!("whisper inference: {e}")))?;

            let mut text = String::new();
            for i in 0..state.full_n_segments() {
                if let Some(segment) = state.get_segment(i) {
                    if let Ok(seg_text) = segment.to_str() {
                        text.push_str(seg_text);
                    }
                }
            }

            Ok(text.trim().to_string())
        })
        .await
        .map_err(|e| TranscriptionError::Backend(format!("whisper task join: {e}")))??;

        tracing::debug!(text_len = text.len(), "whisper transcription complete");
        Ok(text)
    }

    fn name(&self) -> &str {
        "local-whisper"
    }
}
