use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::debug;

use super::{
    resolve_model, token_count, Completion, CompletionOptions, CompletionProvider,
    DEFAULT_MAX_TOKENS,
};
use crate::error::ProviderError;
use crate::http::{send_json, trim_base_url};

const PROVIDER: &str = "anthropic";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages API.
pub struct AnthropicCompletion {
    client: Client,
    api_key: Option<SecretString>,
    base_url: String,
    model: String,
}

impl AnthropicCompletion {
    pub fn new(
        client: Client,
        api_key: Option<SecretString>,
        base_url: Option<&str>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: trim_base_url(base_url.unwrap_or(DEFAULT_BASE_URL)),
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicCompletion {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        options: &CompletionOptions,
    ) -> Result<Completion, ProviderError> {
        let api_key = self
            .api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or_else(|| ProviderError::configuration(PROVIDER, "llm.api_key is not set"))?;

        let model = resolve_model(options, &self.model);
        let mut body = json!({
            "model": model,
            "system": system_prompt,
            "messages": [{"role": "user", "content": user_message}],
            "max_tokens": options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });
        if let Some(temperature) = options.temperature {
            body["temperature"] = json!(temperature);
        }

        debug!(
            event_name = "provider.completion.request",
            provider = PROVIDER,
            model,
            "sending completion"
        );
        let request = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        parse_messages_response(&send_json(PROVIDER, request).await?)
    }
}

pub(crate) fn parse_messages_response(payload: &Value) -> Result<Completion, ProviderError> {
    if payload.get("type").and_then(Value::as_str) == Some("error") {
        let message = payload
            .pointer("/error/message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(ProviderError::upstream(PROVIDER, None, message));
    }

    let blocks = payload
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::upstream(PROVIDER, None, "response had no content blocks"))?;
    let text = blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("");

    let input = payload.pointer("/usage/input_tokens").and_then(Value::as_u64).unwrap_or(0);
    let output = payload.pointer("/usage/output_tokens").and_then(Value::as_u64).unwrap_or(0);

    Ok(Completion { text, tokens_used: token_count(Some(input + output)) })
}
