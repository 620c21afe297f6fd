//! Reply generation for the talkback voice agent
//!
//! The prompt model, the narrow language-model backend contract, and the
//! response generator that turns a user utterance plus bounded history into a
//! single assistant utterance.

pub mod backend;
pub mod generator;
pub mod prompt;

pub use backend::{GenerationParams, HttpLlmBackend, LlmBackend};
pub use generator::{ResponseGenerator, NO_INPUT_PLACEHOLDER, NO_OUTPUT_PLACEHOLDER};
pub use prompt::{Message, PromptBuilder, Role};
