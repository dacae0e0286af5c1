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

const PROVIDER: &str = "openai";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat completions API.
pub struct OpenAiCompletion {
    client: Client,
    api_key: Option<SecretString>,
    base_url: String,
    model: String,
}

impl OpenAiCompletion {
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
impl CompletionProvider for OpenAiCompletion {
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
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_message},
            ],
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
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key.expose_secret())
            .json(&body);

        parse_chat_response(&send_json(PROVIDER, request).await?)
    }
}

pub(crate) fn parse_chat_response(payload: &Value) -> Result<Completion, ProviderError> {
    if let Some(error) = payload.get("error").filter(|error| !error.is_null()) {
        let message = error.get("message").and_then(Value::as_str).unwrap_or("unknown error");
        return Err(ProviderError::upstream(PROVIDER, None, message));
    }

    let text = payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::upstream(PROVIDER, None, "response had no message content"))?;
    let tokens_used = token_count(payload.pointer("/usage/total_tokens").and_then(Value::as_u64));

    Ok(Completion { text: text.to_string(), tokens_used })
}
