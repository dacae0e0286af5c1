use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use crate::error::ProviderError;

const USER_AGENT: &str = concat!("canvass/", env!("CARGO_PKG_VERSION"));
const ERROR_BODY_LIMIT: usize = 500;

pub(crate) fn build_client(timeout_secs: u64) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|error| ProviderError::configuration("http", error.to_string()))
}

/// Sends the request and decodes a JSON body. Non-success statuses become
/// `Upstream` errors carrying the status and a bounded body excerpt.
pub(crate) async fn send_json(
    provider: &'static str,
    request: RequestBuilder,
) -> Result<Value, ProviderError> {
    let body = send_text(provider, request).await?;
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|error| {
        ProviderError::upstream(provider, None, format!("response was not valid json: {error}"))
    })
}

pub(crate) async fn send_text(
    provider: &'static str,
    request: RequestBuilder,
) -> Result<String, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|error| ProviderError::upstream(provider, None, error.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|error| ProviderError::upstream(provider, Some(status.as_u16()), error.to_string()))?;

    if !status.is_success() {
        return Err(ProviderError::upstream(
            provider,
            Some(status.as_u16()),
            truncate_chars(body.trim(), ERROR_BODY_LIMIT),
        ));
    }

    Ok(body)
}

/// Cuts `text` to at most `max_chars` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}

pub(crate) fn trim_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Picks the first non-empty string among `keys` on a JSON object.
pub(crate) fn first_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}
