//! Turn orchestrator
//!
//! Sequences one conversational turn through the pipeline:
//! receive input -> transcribe -> read history -> generate -> persist turn ->
//! synthesize -> respond. Stage failures degrade the turn instead of aborting
//! it; every request that reaches the response stage yields some text+audio
//! pair.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use talkback_config::Settings;
use talkback_core::{Error, Result};
use talkback_llm::{ResponseGenerator, NO_INPUT_PLACEHOLDER, NO_OUTPUT_PLACEHOLDER};
use talkback_memory::ConversationStore;

use crate::normalize::AudioNormalizer;
use crate::stt::Transcriber;
use crate::tts::Synthesizer;

/// Session used when the client does not name one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// User text recorded when a request carries neither audio nor text.
pub const NO_AUDIO_NO_TEXT_SENTINEL: &str = "(no audio, no text)";

/// Spoken when synthesis of the real reply fails and is retried once.
pub const TTS_FALLBACK_PHRASE: &str = "Sorry, I could not prepare audio for this reply.";

/// One turn request, transport-agnostic.
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    /// Session identifier; the sentinel session is used when absent.
    pub session_id: Option<String>,
    /// Raw audio bytes in any supported container.
    pub audio: Option<Vec<u8>>,
    /// Text override; when non-empty after trimming it wins over audio.
    pub override_text: Option<String>,
}

/// One turn response: text and audio, always paired.
#[derive(Debug, Clone)]
pub struct TurnResponse {
    pub assistant_text: String,
    /// 16-bit PCM mono WAV
    pub audio_wav: Vec<u8>,
    /// Stage failures that were degraded rather than propagated.
    pub degradations: Vec<Degradation>,
}

/// Pipeline stages for one request, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    ReceivingInput,
    Transcribing,
    ReadingHistory,
    Generating,
    PersistingTurn,
    Synthesizing,
    Responding,
}

/// The stage a degraded failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Decode,
    Transcription,
    Generation,
    Synthesis,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Decode => "decode",
            FailureKind::Transcription => "transcription",
            FailureKind::Generation => "generation",
            FailureKind::Synthesis => "synthesis",
        }
    }
}

/// A stage failure that was converted into a degraded continuation.
#[derive(Debug, Clone)]
pub struct Degradation {
    pub kind: FailureKind,
    pub detail: String,
}

/// How the orchestrator continues after a stage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Substitute a sentinel user text and keep going.
    SubstituteUserText,
    /// Answer with a fallback reply; do not persist a turn.
    FallbackReplySkipPersist,
    /// Retry synthesis once with a fallback phrase, then fall back to silence.
    FallbackAudio,
}

/// The failure policy, as an explicit table rather than scattered catches.
pub fn failure_policy(kind: FailureKind) -> FailureAction {
    match kind {
        FailureKind::Decode | FailureKind::Transcription => FailureAction::SubstituteUserText,
        FailureKind::Generation => FailureAction::FallbackReplySkipPersist,
        FailureKind::Synthesis => FailureAction::FallbackAudio,
    }
}

/// Sequences the pipeline components for one turn.
pub struct TurnOrchestrator {
    normalizer: AudioNormalizer,
    transcriber: Arc<Transcriber>,
    generator: Arc<ResponseGenerator>,
    synthesizer: Arc<Synthesizer>,
    store: Arc<ConversationStore>,
    max_turns: usize,
    /// Bounds concurrent model calls across all requests.
    inference: Semaphore,
}

impl TurnOrchestrator {
    /// Orchestrator over the configured backends.
    pub fn new(settings: &Settings, store: Arc<ConversationStore>) -> Self {
        Self::with_components(
            Arc::new(Transcriber::new(&settings.stt)),
            Arc::new(ResponseGenerator::new(&settings.llm)),
            Arc::new(Synthesizer::new(&settings.tts)),
            store,
            settings.history.max_turns,
            settings.limits.max_concurrent_inference,
        )
    }

    /// Orchestrator over pre-built components (used by tests).
    pub fn with_components(
        transcriber: Arc<Transcriber>,
        generator: Arc<ResponseGenerator>,
        synthesizer: Arc<Synthesizer>,
        store: Arc<ConversationStore>,
        max_turns: usize,
        max_concurrent_inference: usize,
    ) -> Self {
        Self {
            normalizer: AudioNormalizer::new(),
            transcriber,
            generator,
            synthesizer,
            store,
            max_turns,
            inference: Semaphore::new(max_concurrent_inference.max(1)),
        }
    }

    /// Run one turn through the pipeline.
    ///
    /// Stage failures in transcription, generation, and synthesis degrade the
    /// response per `failure_policy`; the only `Err` here is an internal
    /// orchestrator failure, which persists nothing.
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnResponse> {
        let started = Instant::now();
        let session_id = request
            .session_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());
        let mut degradations = Vec::new();

        // ReceivingInput / Transcribing
        let user_text = self
            .resolve_user_text(&request, &session_id, &mut degradations)
            .await?;

        // ReadingHistory
        let history = self.store.read(&session_id, self.max_turns);
        tracing::debug!(
            stage = ?TurnStage::ReadingHistory,
            session_id = %session_id,
            history_turns = history.len(),
            "read conversation history"
        );

        // Generating
        let generated = {
            let _permit = self.inference_permit().await?;
            tracing::debug!(stage = ?TurnStage::Generating, session_id = %session_id, "generating reply");
            match self.generator.generate(&user_text, &history).await {
                Ok(text) => Some(text),
                Err(e) => {
                    self.record_failure(FailureKind::Generation, &e.to_string(), &mut degradations);
                    None
                }
            }
        };

        // PersistingTurn: only with actually generated text, so history always
        // reflects what was truly computed before synthesis.
        let assistant_text = match generated {
            Some(text) => {
                tracing::debug!(stage = ?TurnStage::PersistingTurn, session_id = %session_id, "persisting turn");
                self.store
                    .append(&session_id, user_text.clone(), text.clone(), self.max_turns);
                text
            }
            None => NO_OUTPUT_PLACEHOLDER.to_string(),
        };

        // Synthesizing
        let audio_wav = self
            .synthesize_with_fallback(&assistant_text, &mut degradations)
            .await?;

        // Responding
        metrics::counter!("talkback_turns_total").increment(1);
        metrics::histogram!("talkback_turn_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(
            session_id = %session_id,
            user_text = %user_text,
            assistant_text = %assistant_text,
            audio_bytes = audio_wav.len(),
            degradations = degradations.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "turn complete"
        );

        Ok(TurnResponse {
            assistant_text,
            audio_wav,
            degradations,
        })
    }

    /// Resolve the user utterance: override text when present, otherwise the
    /// transcription of the supplied audio, degrading decode/transcription
    /// failures to sentinel text.
    async fn resolve_user_text(
        &self,
        request: &TurnRequest,
        session_id: &str,
        degradations: &mut Vec<Degradation>,
    ) -> Result<String> {
        if let Some(text) = request.override_text.as_deref() {
            let text = text.trim();
            if !text.is_empty() {
                tracing::debug!(
                    stage = ?TurnStage::ReceivingInput,
                    session_id = %session_id,
                    "using text override, skipping transcription"
                );
                return Ok(text.to_string());
            }
        }

        let Some(audio_bytes) = request.audio.as_deref() else {
            tracing::debug!(
                stage = ?TurnStage::ReceivingInput,
                session_id = %session_id,
                "request carries neither audio nor text"
            );
            return Ok(NO_AUDIO_NO_TEXT_SENTINEL.to_string());
        };
        tracing::debug!(
            stage = ?TurnStage::Transcribing,
            session_id = %session_id,
            audio_bytes = audio_bytes.len(),
            "transcribing request audio"
        );

        let waveform = match self.normalizer.normalize(audio_bytes) {
            Ok(waveform) => waveform,
            Err(e) => {
                self.record_failure(FailureKind::Decode, &e.to_string(), degradations);
                return Ok(NO_INPUT_PLACEHOLDER.to_string());
            }
        };

        if waveform.is_empty() {
            return Ok(String::new());
        }

        let _permit = self.inference_permit().await?;
        match self.transcriber.transcribe(&waveform, None).await {
            Ok(text) => Ok(text),
            Err(e) => {
                self.record_failure(FailureKind::Transcription, &e.to_string(), degradations);
                Ok(NO_INPUT_PLACEHOLDER.to_string())
            }
        }
    }

    /// Synthesize the reply; on failure retry once with the fallback phrase,
    /// then settle for silence. The response is never a truncated stream.
    async fn synthesize_with_fallback(
        &self,
        assistant_text: &str,
        degradations: &mut Vec<Degradation>,
    ) -> Result<Vec<u8>> {
        let _permit = self.inference_permit().await?;
        tracing::debug!(stage = ?TurnStage::Synthesizing, text_len = assistant_text.len(), "synthesizing reply");

        match self.synthesizer.synthesize(assistant_text).await {
            Ok(audio) => Ok(audio),
            Err(e) => {
                self.record_failure(FailureKind::Synthesis, &e.to_string(), degradations);
                match self.synthesizer.synthesize(TTS_FALLBACK_PHRASE).await {
                    Ok(audio) => Ok(audio),
                    Err(retry_err) => {
                        tracing::warn!(
                            error = %retry_err,
                            "fallback-phrase synthesis failed, answering with silence"
                        );
                        Ok(self.synthesizer.silence().unwrap_or_default())
                    }
                }
            }
        }
    }

    async fn inference_permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>> {
        self.inference
            .acquire()
            .await
            .map_err(|_| Error::other("inference semaphore closed"))
    }

    fn record_failure(
        &self,
        kind: FailureKind,
        detail: &str,
        degradations: &mut Vec<Degradation>,
    ) {
        tracing::warn!(
            stage = kind.as_str(),
            action = ?failure_policy(kind),
            error = %detail,
            "stage failed, degrading turn"
        );
        metrics::counter!("talkback_stage_failures_total", "stage" => kind.as_str()).increment(1);
        degradations.push(Degradation {
            kind,
            detail: detail.to_string(),
        });
    }
}
