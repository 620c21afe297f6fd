//! HTTP speech-to-text backend (OpenAI-compatible transcription API)

use async_trait::async_trait;
use serde::Deserialize;

use talkback_config::SttConfig;
use talkback_core::{NormalizedAudio, TranscriptionError};

use crate::wav;

use super::SttBackend;

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Transcription over an OpenAI-compatible `/audio/transcriptions` endpoint.
pub struct HttpSttBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpSttBackend {
    pub fn new(config: &SttConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl SttBackend for HttpSttBackend {
    async fn transcribe(
        &self,
        audio: &NormalizedAudio,
        language: Option<&str>,
    ) -> Result<String, TranscriptionError> {
        let wav_bytes = wav::encode_pcm16(audio.samples(), audio.sample_rate())
            .map_err(|e| TranscriptionError::Backend(e.to_string()))?;

        tracing::debug!(
            audio_secs = audio.duration_secs(),
            model = %self.model,
            "requesting transcription"
        );

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav_bytes)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| TranscriptionError::Backend(e.to_string()))?,
            )
            .text("model", self.model.clone());
        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }

        let url = format!("{}/audio/transcriptions", self.base_url);
        let mut request = self.client.post(&url).multipart(form);
        if let Some(ref key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| TranscriptionError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(TranscriptionError::Backend(format!(
                "STT API error {status}: {body}"
            )));
        }

        let result: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| TranscriptionError::InvalidResponse(e.to_string()))?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }

    fn name(&self) -> &str {
        "http-transcription"
    }
}
