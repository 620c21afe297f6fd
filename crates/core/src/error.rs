//! Error types for the voice agent

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the voice agent
#[derive(Error, Debug)]
pub enum Error {
    // Stage errors
    #[error("Audio decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Transcription error: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

/// Failures while decoding an audio byte buffer into a waveform.
///
/// These are request-level failures: the orchestrator degrades the turn to a
/// sentinel user text instead of aborting.
#[derive(Error, Debug, Clone)]
pub enum DecodeError {
    #[error("Unrecognized audio container")]
    UnrecognizedFormat,

    #[error("Malformed audio container: {0}")]
    Malformed(String),

    #[error("Resampling error: {0}")]
    Resample(String),
}

/// Failures in the speech-to-text backend.
#[derive(Error, Debug, Clone)]
pub enum TranscriptionError {
    #[error("STT backend initialization failed: {0}")]
    Init(String),

    #[error("STT backend error: {0}")]
    Backend(String),

    #[error("Invalid STT response: {0}")]
    InvalidResponse(String),
}

/// Failures in the language-model backend.
#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    #[error("LLM backend initialization failed: {0}")]
    Init(String),

    #[error("LLM backend error: {0}")]
    Backend(String),

    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),
}

/// Failures in the text-to-speech backend.
#[derive(Error, Debug, Clone)]
pub enum SynthesisError {
    #[error("TTS backend initialization failed: {0}")]
    Init(String),

    #[error("TTS backend error: {0}")]
    Backend(String),

    #[error("TTS backend returned invalid audio: {0}")]
    InvalidAudio(String),

    #[error("WAV encoding error: {0}")]
    Encode(String),
}
