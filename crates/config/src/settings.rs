//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Main application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Speech-to-text backend configuration
    #[serde(default)]
    pub stt: SttConfig,

    /// Language-model backend configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Text-to-speech backend configuration
    #[serde(default)]
    pub tts: TtsConfig,

    /// Conversation history configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// Resource limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history.max_turns == 0 {
            return Err(ConfigError::InvalidValue {
                field: "history.max_turns".to_string(),
                message: "history bound must be at least 1".to_string(),
            });
        }

        if self.limits.max_concurrent_inference == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.max_concurrent_inference".to_string(),
                message: "inference concurrency must be at least 1".to_string(),
            });
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: format!("temperature {} outside [0, 2]", self.llm.temperature),
            });
        }

        if self.llm.max_new_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.max_new_tokens".to_string(),
                message: "must generate at least one token".to_string(),
            });
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Directory for archiving uploaded audio and synthesized replies.
    /// Disabled when unset.
    #[serde(default)]
    pub archive_dir: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: default_true(),
            archive_dir: None,
        }
    }
}

/// Speech-to-text backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// Base URL of the OpenAI-compatible transcription API
    #[serde(default = "default_stt_base_url")]
    pub base_url: String,

    /// Model identifier sent to the backend
    #[serde(default = "default_stt_model")]
    pub model: String,

    /// API key, when the backend requires one
    #[serde(default)]
    pub api_key: Option<String>,

    /// Forced transcription language (ISO 639-1); auto-detect when unset
    #[serde(default)]
    pub language: Option<String>,

    /// Path to a local GGML Whisper model (used by the `local-whisper`
    /// pipeline feature instead of the HTTP backend)
    #[serde(default)]
    pub model_path: Option<String>,
}

fn default_stt_base_url() -> String {
    "http://127.0.0.1:8000/v1".to_string()
}
fn default_stt_model() -> String {
    "whisper-1".to_string()
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            base_url: default_stt_base_url(),
            model: default_stt_model(),
            api_key: None,
            language: None,
            model_path: None,
        }
    }
}

/// Language-model backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible completion API
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model identifier sent to the backend
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key, when the backend requires one
    #[serde(default)]
    pub api_key: Option<String>,

    /// Maximum new tokens per reply
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling threshold
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Use the backend's structured chat format; when false, a manually
    /// formatted transcript is sent to the plain completion endpoint
    #[serde(default = "default_true")]
    pub chat_template: bool,

    /// Truncate replies to their first line (keeps synthesized speech short)
    #[serde(default = "default_true")]
    pub single_line: bool,

    /// System instruction prepended to every prompt
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_llm_base_url() -> String {
    "http://127.0.0.1:8001/v1".to_string()
}
fn default_llm_model() -> String {
    "tinyllama-1.1b-chat".to_string()
}
fn default_max_new_tokens() -> u32 {
    128
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.9
}
fn default_system_prompt() -> String {
    "You are a concise, helpful voice assistant. \
     Answer clearly, keep responses brief unless asked for details."
        .to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key: None,
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            chat_template: default_true(),
            single_line: default_true(),
            system_prompt: default_system_prompt(),
        }
    }
}

/// Text-to-speech backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Base URL of the OpenAI-compatible speech API
    #[serde(default = "default_tts_base_url")]
    pub base_url: String,

    /// Model identifier sent to the backend
    #[serde(default = "default_tts_model")]
    pub model: String,

    /// API key, when the backend requires one
    #[serde(default)]
    pub api_key: Option<String>,

    /// Voice identifier
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Speaking rate multiplier
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_tts_base_url() -> String {
    "http://127.0.0.1:8002/v1".to_string()
}
fn default_tts_model() -> String {
    "tts-1".to_string()
}
fn default_voice() -> String {
    "alloy".to_string()
}
fn default_speed() -> f32 {
    1.0
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: default_tts_base_url(),
            model: default_tts_model(),
            api_key: None,
            voice: default_voice(),
            speed: default_speed(),
        }
    }
}

/// Conversation history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Turns kept per session; the oldest turn is evicted past this bound
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

fn default_max_turns() -> usize {
    5
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

/// Resource limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Model calls allowed in flight at once, across all requests
    #[serde(default = "default_max_concurrent_inference")]
    pub max_concurrent_inference: usize,
}

fn default_max_concurrent_inference() -> usize {
    2
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_inference: default_max_concurrent_inference(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Enable the Prometheus /metrics endpoint
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (TALKBACK prefix, `__` separator)
/// 2. config/default.yaml (if present)
/// 3. Built-in defaults
pub fn load_settings() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("TALKBACK")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.history.max_turns, 5);
        assert_eq!(settings.llm.max_new_tokens, 128);
        assert!(settings.llm.chat_template);
        assert!(settings.llm.single_line);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();
        settings.history.max_turns = 0;
        assert!(settings.validate().is_err());

        settings.history.max_turns = 5;
        settings.llm.temperature = 3.0;
        assert!(settings.validate().is_err());

        settings.llm.temperature = 0.7;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_inference_slots_rejected() {
        let mut settings = Settings::default();
        settings.limits.max_concurrent_inference = 0;
        assert!(settings.validate().is_err());
    }
}
