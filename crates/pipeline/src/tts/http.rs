//! HTTP text-to-speech backend (OpenAI-compatible speech API)

use async_trait::async_trait;
use serde::Serialize;

use talkback_config::TtsConfig;
use talkback_core::SynthesisError;

use crate::wav;

use super::{RawSpeech, TtsBackend};

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'a str,
}

/// Synthesis over an OpenAI-compatible `/audio/speech` endpoint.
pub struct HttpTtsBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    voice: String,
    speed: f32,
    api_key: Option<String>,
}

impl HttpTtsBackend {
    pub fn new(config: &TtsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            voice: config.voice.clone(),
            speed: config.speed,
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl TtsBackend for HttpTtsBackend {
    async fn synthesize(&self, text: &str) -> Result<RawSpeech, SynthesisError> {
        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
            response_format: "wav",
        };

        tracing::debug!(text_len = text.len(), voice = %self.voice, "requesting speech synthesis");

        let url = format!("{}/audio/speech", self.base_url);
        let mut builder = self.client.post(&url).json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SynthesisError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "speech API error");
            return Err(SynthesisError::Backend(format!(
                "TTS API error {status}: {body}"
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Backend(e.to_string()))?;

        let decoded =
            wav::decode(&audio).map_err(|e| SynthesisError::InvalidAudio(e.to_string()))?;

        // Downmix in case the backend ignores the mono convention.
        let samples = if decoded.channels > 1 {
            decoded
                .samples
                .chunks_exact(decoded.channels as usize)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect()
        } else {
            decoded.samples
        };

        tracing::info!(samples = samples.len(), rate = decoded.sample_rate, "synthesis complete");

        Ok(RawSpeech {
            samples,
            sample_rate: decoded.sample_rate,
        })
    }

    fn name(&self) -> &str {
        "http-speech"
    }
}
