//! Core types for the talkback voice agent
//!
//! This crate provides the foundational types shared by all other crates:
//! - Completed conversation turns
//! - Normalized audio buffers
//! - The per-stage error taxonomy

pub mod audio;
pub mod error;
pub mod turn;

pub use audio::{NormalizedAudio, CANONICAL_SAMPLE_RATE};
pub use error::{DecodeError, Error, GenerationError, Result, SynthesisError, TranscriptionError};
pub use turn::Turn;
