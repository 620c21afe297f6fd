//! Response generator
//!
//! Wraps a language-model backend: builds the conversational prompt, runs
//! generation with fixed parameters, and post-processes the raw output into a
//! single assistant utterance.

use std::sync::Arc;

use tokio::sync::OnceCell;

use talkback_config::LlmConfig;
use talkback_core::{GenerationError, Turn};

use crate::backend::{GenerationParams, HttpLlmBackend, LlmBackend};
use crate::prompt::PromptBuilder;

/// Substituted for a blank user utterance before prompting.
pub const NO_INPUT_PLACEHOLDER: &str = "(no input detected)";

/// Substituted when post-processing leaves nothing; keeps persisted turns
/// from ever carrying empty assistant text.
pub const NO_OUTPUT_PLACEHOLDER: &str = "(no output)";

type BackendFactory =
    Box<dyn Fn() -> Result<Arc<dyn LlmBackend>, GenerationError> + Send + Sync>;

/// Produces one assistant utterance per turn.
///
/// The backend handle is created lazily on first use, exactly once per
/// process, and shared read-only afterwards.
pub struct ResponseGenerator {
    backend: OnceCell<Arc<dyn LlmBackend>>,
    factory: BackendFactory,
    params: GenerationParams,
    system_prompt: String,
    single_line: bool,
}

impl ResponseGenerator {
    /// Generator backed by the configured OpenAI-compatible HTTP endpoint.
    pub fn new(config: &LlmConfig) -> Self {
        let factory_config = config.clone();
        Self {
            backend: OnceCell::new(),
            factory: Box::new(move || {
                Ok(Arc::new(HttpLlmBackend::new(&factory_config)) as Arc<dyn LlmBackend>)
            }),
            params: GenerationParams::from(config),
            system_prompt: config.system_prompt.clone(),
            single_line: config.single_line,
        }
    }

    /// Generator over a pre-built backend (used by tests).
    pub fn with_backend(config: &LlmConfig, backend: Arc<dyn LlmBackend>) -> Self {
        let generator = Self::new(config);
        generator
            .backend
            .set(backend)
            .unwrap_or_else(|_| unreachable!("fresh OnceCell"));
        generator
    }

    async fn backend(&self) -> Result<&Arc<dyn LlmBackend>, GenerationError> {
        self.backend
            .get_or_try_init(|| async { (self.factory)() })
            .await
    }

    /// Generate one assistant utterance from the new user utterance and the
    /// bounded history, oldest first.
    pub async fn generate(
        &self,
        user_text: &str,
        history: &[Turn],
    ) -> Result<String, GenerationError> {
        let user_text = user_text.trim();
        let user_text = if user_text.is_empty() {
            NO_INPUT_PLACEHOLDER
        } else {
            user_text
        };

        let builder = PromptBuilder::new(&self.system_prompt)
            .with_history(history)
            .with_user_text(user_text);

        let backend = self.backend().await?;

        let raw = if backend.supports_chat() {
            backend.chat(&builder.messages(), &self.params).await?
        } else {
            let prompt = builder.transcript();
            let raw = backend.complete(&prompt, &self.params).await?;
            // Completion backends may echo the prompt ahead of the reply.
            match raw.strip_prefix(&prompt) {
                Some(tail) => tail.to_string(),
                None => raw,
            }
        };

        Ok(self.post_process(&raw))
    }

    fn post_process(&self, raw: &str) -> String {
        let mut text = raw.trim();
        if self.single_line {
            text = text.lines().next().unwrap_or("").trim();
        }
        if text.is_empty() {
            NO_OUTPUT_PLACEHOLDER.to_string()
        } else {
            text.to_string()
        }
    }
}
