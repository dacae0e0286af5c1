use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::{resolve_model, token_count, Completion, CompletionOptions, CompletionProvider};
use crate::error::ProviderError;
use crate::http::{send_json, trim_base_url};

const PROVIDER: &str = "ollama";

/// Local `/api/chat`. The base URL doubles as the credential.
pub struct OllamaCompletion {
    client: Client,
    base_url: Option<String>,
    model: String,
}

impl OllamaCompletion {
    pub fn new(client: Client, base_url: Option<&str>, model: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.map(trim_base_url).filter(|url| !url.is_empty()),
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for OllamaCompletion {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        options: &CompletionOptions,
    ) -> Result<Completion, ProviderError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| ProviderError::configuration(PROVIDER, "llm.base_url is not set"))?;

        let model = resolve_model(options, &self.model);
        let mut model_options = json!({});
        if let Some(temperature) = options.temperature {
            model_options["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = options.max_tokens {
            model_options["num_predict"] = json!(max_tokens);
        }
        let body = json!({
            "model": model,
            "stream": false,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_message},
            ],
            "options": model_options,
        });

        debug!(
            event_name = "provider.completion.request",
            provider = PROVIDER,
            model,
            "sending completion"
        );
        let request = self.client.post(format!("{base_url}/api/chat")).json(&body);

        parse_chat_response(&send_json(PROVIDER, request).await?)
    }
}

pub(crate) fn parse_chat_response(payload: &Value) -> Result<Completion, ProviderError> {
    if let Some(message) = payload.get("error").and_then(Value::as_str) {
        return Err(ProviderError::upstream(PROVIDER, None, message));
    }

    let text = payload
        .pointer("/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::upstream(PROVIDER, None, "response had no message content"))?;
    let prompt = payload.get("prompt_eval_count").and_then(Value::as_u64).unwrap_or(0);
    let generated = payload.get("eval_count").and_then(Value::as_u64).unwrap_or(0);

    Ok(Completion { text: text.to_string(), tokens_used: token_count(Some(prompt + generated)) })
}

#[cfg(test)]
mod tests {
    use reqwest::Client;
    use serde_json::json;

    use super::{parse_chat_response, OllamaCompletion};
    use crate::completion::{CompletionOptions, CompletionProvider};
    use crate::error::ProviderError;

    #[test]
    fn chat_response_counts_prompt_and_eval_tokens() {
        let payload = json!({
            "message": {"role": "assistant", "content": "Draft"},
            "done": true,
            "prompt_eval_count": 40,
            "eval_count": 12
        });

        let completion = parse_chat_response(&payload).expect("parse");
        assert_eq!(completion.text, "Draft");
        assert_eq!(completion.tokens_used, 52);
    }

    #[test]
    fn error_field_is_upstream() {
        let error = parse_chat_response(&json!({"error": "model 'llama9' not found"}))
            .expect_err("error payload");
        assert!(matches!(error, ProviderError::Upstream { provider: "ollama", .. }));
    }

    #[tokio::test]
    async fn blank_base_url_is_configuration_error() {
        let provider = OllamaCompletion::new(Client::new(), Some("  "), "llama3.1");
        let error = provider
            .complete("system", "user", &CompletionOptions::default())
            .await
            .expect_err("no base url");
        assert!(matches!(error, ProviderError::Configuration { .. }));
    }
}
