use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;

pub mod basic;
pub mod firecrawl;
pub mod tavily;

pub use basic::BasicDiscovery;
pub use firecrawl::FirecrawlDiscovery;
pub use tavily::TavilyDiscovery;

#[derive(Clone, Debug, PartialEq)]
pub struct ScrapedPage {
    pub content: String,
    pub metadata: Value,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
}

impl SearchHit {
    /// Content, else snippet, else description; blank values are skipped.
    pub fn best_text(&self) -> Option<&str> {
        [&self.content, &self.snippet, &self.description]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .map(str::trim)
            .find(|text| !text.is_empty())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchOptions {
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { limit: 5 }
    }
}

#[async_trait]
pub trait DiscoveryProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ProviderError>;

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, ProviderError>;
}
