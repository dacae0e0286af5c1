use async_trait::async_trait;

use crate::error::ProviderError;

pub mod anthropic;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicCompletion;
pub use ollama::OllamaCompletion;
pub use openai::OpenAiCompletion;

pub const DEFAULT_MAX_TOKENS: u32 = 2_048;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Overrides the backend's configured model for one call.
    pub model: Option<String>,
}

impl CompletionOptions {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u32,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        options: &CompletionOptions,
    ) -> Result<Completion, ProviderError>;
}

fn resolve_model<'a>(options: &'a CompletionOptions, default_model: &'a str) -> &'a str {
    options
        .model
        .as_deref()
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .unwrap_or(default_model)
}

fn token_count(value: Option<u64>) -> u32 {
    value.and_then(|count| u32::try_from(count).ok()).unwrap_or(0)
}
