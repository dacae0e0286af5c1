use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{DiscoveryProvider, ScrapedPage, SearchHit, SearchOptions};
use crate::error::ProviderError;
use crate::http::{send_json, trim_base_url, truncate_chars};

const PROVIDER: &str = "tavily";
const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Managed search plus the extract endpoint for single pages.
pub struct TavilyDiscovery {
    client: Client,
    api_key: Option<SecretString>,
    base_url: String,
    max_content_chars: usize,
}

#[derive(Debug, Serialize)]
struct TavilySearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct TavilySearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    raw_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TavilyExtractResponse {
    #[serde(default)]
    results: Vec<TavilyExtracted>,
    #[serde(default)]
    failed_results: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TavilyExtracted {
    url: String,
    #[serde(default)]
    raw_content: Option<String>,
}

impl TavilyDiscovery {
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
impl DiscoveryProvider for TavilyDiscovery {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ProviderError> {
        let api_key = self.api_key()?;
        debug!(event_name = "provider.discovery.scrape", provider = PROVIDER, url, "extracting page");

        let request = self
            .client
            .post(format!("{}/extract", self.base_url))
            .json(&json!({"api_key": api_key, "urls": [url]}));
        let payload = send_json(PROVIDER, request).await?;
        let response: TavilyExtractResponse = serde_json::from_value(payload)
            .map_err(|error| ProviderError::upstream(PROVIDER, None, error.to_string()))?;

        let extracted = response.results.into_iter().next().ok_or_else(|| {
            let reason = response
                .failed_results
                .first()
                .and_then(|failure| failure.get("error"))
                .and_then(|error| error.as_str())
                .unwrap_or("no content extracted");
            ProviderError::upstream(PROVIDER, None, reason)
        })?;

        let content = extracted.raw_content.unwrap_or_default();
        Ok(ScrapedPage {
            content: truncate_chars(content.trim(), self.max_content_chars),
            metadata: json!({"url": extracted.url, "provider": PROVIDER}),
        })
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, ProviderError> {
        let api_key = self.api_key()?;
        debug!(event_name = "provider.discovery.search", provider = PROVIDER, query, "searching");

        let request = self.client.post(format!("{}/search", self.base_url)).json(
            &TavilySearchRequest {
                api_key,
                query,
                max_results: options.limit,
                include_raw_content: true,
            },
        );
        let payload = send_json(PROVIDER, request).await?;
        let response: TavilySearchResponse = serde_json::from_value(payload)
            .map_err(|error| ProviderError::upstream(PROVIDER, None, error.to_string()))?;

        Ok(into_hits(response, self.max_content_chars))
    }
}

fn into_hits(response: TavilySearchResponse, max_content_chars: usize) -> Vec<SearchHit> {
    response
        .results
        .into_iter()
        .map(|result| SearchHit {
            url: result.url,
            title: result.title,
            snippet: result.content,
            content: result.raw_content.map(|text| truncate_chars(text.trim(), max_content_chars)),
            description: None,
        })
        .collect()
}
