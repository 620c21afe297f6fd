//! Configuration for the talkback voice agent
//!
//! Settings are fixed at process start: defaults, overlaid by an optional
//! `config/default.yaml`, overlaid by `TALKBACK__*` environment variables.

mod settings;

pub use settings::{
    load_settings, ConfigError, HistoryConfig, LimitsConfig, LlmConfig, ObservabilityConfig,
    ServerConfig, Settings, SttConfig, TtsConfig,
};
