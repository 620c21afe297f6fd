//! Request pipeline for the talkback voice agent
//!
//! The multi-stage transform chain behind one conversational turn:
//! - Audio normalization (decode, downmix, resample)
//! - Speech-to-text behind a narrow backend contract
//! - Text-to-speech behind a narrow backend contract
//! - The per-request orchestrator sequencing the stages

pub mod normalize;
pub mod orchestrator;
pub mod stt;
pub mod tts;
pub mod wav;

pub use normalize::AudioNormalizer;
pub use orchestrator::{
    failure_policy, Degradation, FailureAction, FailureKind, TurnOrchestrator, TurnRequest,
    TurnResponse, TurnStage, DEFAULT_SESSION_ID, NO_AUDIO_NO_TEXT_SENTINEL, TTS_FALLBACK_PHRASE,
};
pub use stt::{SttBackend, Transcriber};
pub use tts::{RawSpeech, Synthesizer, TtsBackend};
