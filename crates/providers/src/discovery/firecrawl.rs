use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::debug;

use super::{DiscoveryProvider, ScrapedPage, SearchHit, SearchOptions};
use crate::error::ProviderError;
use crate::http::{first_string, send_json, trim_base_url, truncate_chars};

const PROVIDER: &str = "firecrawl";
const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev";

/// Managed rendering scrape and search.
pub struct FirecrawlDiscovery {
    client: Client,
    api_key: Option<SecretString>,
    base_url: String,
    max_content_chars: usize,
}

impl FirecrawlDiscovery {
    pub fn new(
        client: Client,
        api_key: Option<SecretString>,
        base_url: Option<&str>,
        max_content_chars: usize,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: trim_base_url(base_url.unwrap_or(DEFAULT_BASE_URL)),
            max_content_chars,
        }
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ProviderError::configuration(PROVIDER, "discovery.api_key is not set"))
    }
}

#[async_trait]
impl DiscoveryProvider for FirecrawlDiscovery {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ProviderError> {
        let api_key = self.api_key()?;
        debug!(event_name = "provider.discovery.scrape", provider = PROVIDER, url, "scraping page");

        let request = self
            .client
            .post(format!("{}/v1/scrape", self.base_url))
            .bearer_auth(api_key)
            .json(&json!({"url": url, "formats": ["markdown"], "onlyMainContent": true}));
        let payload = send_json(PROVIDER, request).await?;
        ensure_success(&payload)?;

        let data = payload.get("data").cloned().unwrap_or(Value::Null);
        let content = first_string(&data, &["markdown", "content"]).unwrap_or_default();
        let metadata = data.get("metadata").cloned().unwrap_or_else(|| json!({}));

        Ok(ScrapedPage { content: truncate_chars(&content, self.max_content_chars), metadata })
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, ProviderError> {
        let api_key = self.api_key()?;
        debug!(event_name = "provider.discovery.search", provider = PROVIDER, query, "searching");

        let request = self
            .client
            .post(format!("{}/v1/search", self.base_url))
            .bearer_auth(api_key)
            .json(&json!({
                "query": query,
                "limit": options.limit,
                "scrapeOptions": {"formats": ["markdown"]},
            }));
        let payload = send_json(PROVIDER, request).await?;
        ensure_success(&payload)?;

        Ok(parse_search_results(&payload, self.max_content_chars))
    }
}

fn ensure_success(payload: &Value) -> Result<(), ProviderError> {
    if payload.get("success").and_then(Value::as_bool) == Some(false) {
        let message = first_string(payload, &["error", "message"])
            .unwrap_or_else(|| "request was not successful".to_string());
        return Err(ProviderError::upstream(PROVIDER, None, message));
    }
    Ok(())
}

pub(crate) fn parse_search_results(payload: &Value, max_content_chars: usize) -> Vec<SearchHit> {
    payload
        .get("data")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let url = first_string(item, &["url"])?;
                    Some(SearchHit {
                        url,
                        title: first_string(item, &["title"]),
                        snippet: None,
                        content: first_string(item, &["markdown", "content"])
                            .map(|text| truncate_chars(&text, max_content_chars)),
                        description: first_string(item, &["description"]),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
