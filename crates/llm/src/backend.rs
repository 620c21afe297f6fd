//! Language-model backend contract and the OpenAI-compatible HTTP backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use talkback_config::LlmConfig;
use talkback_core::GenerationError;

use crate::prompt::Message;

/// Fixed generation parameters; configuration, not per-request.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl From<&LlmConfig> for GenerationParams {
    fn from(config: &LlmConfig) -> Self {
        Self {
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
        }
    }
}

/// Narrow contract over a causal-language-model engine.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Whether the backend accepts a structured chat-format prompt.
    fn supports_chat(&self) -> bool;

    /// Generate a reply from a structured message list.
    async fn chat(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<String, GenerationError>;

    /// Generate a continuation of a flat prompt.
    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError>;

    /// Human-readable backend name.
    fn name(&self) -> &str;
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

/// Generation over an OpenAI-compatible completion API
/// (`/chat/completions` and `/completions`).
pub struct HttpLlmBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    chat_template: bool,
}

impl HttpLlmBackend {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            chat_template: config.chat_template,
        }
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(url);
        if let Some(ref key) = self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }
        builder
    }
}

#[async_trait]
impl LlmBackend for HttpLlmBackend {
    fn supports_chat(&self) -> bool {
        self.chat_template
    }

    async fn chat(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: params.max_new_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
        };

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(messages = messages.len(), model = %self.model, "requesting chat completion");

        let response = self
            .request(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat completion error");
            return Err(GenerationError::Backend(format!(
                "LLM API error {status}: {body}"
            )));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("no choices returned".to_string()))
    }

    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: params.max_new_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
        };

        let url = format!("{}/completions", self.base_url);
        tracing::debug!(prompt_len = prompt.len(), model = %self.model, "requesting completion");

        let response = self
            .request(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "completion error");
            return Err(GenerationError::Backend(format!(
                "LLM API error {status}: {body}"
            )));
        }

        let result: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| GenerationError::InvalidResponse("no choices returned".to_string()))
    }

    fn name(&self) -> &str {
        "openai-compat"
    }
}
