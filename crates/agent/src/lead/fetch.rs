//! Stage B: run fetch tasks one at a time, absorbing per-task failures.

use canvass_providers::{DiscoveryProvider, ProviderError, SearchOptions};
use serde::Serialize;
use tracing::{debug, warn};

use super::query::FetchTask;
use crate::prompts::{bounded, MAX_ITEM_CHARS};

/// Scraped pages at or below this many chars are dropped.
pub const MIN_PAGE_CHARS: usize = 50;
/// Search results whose best text is at or below this many chars are dropped.
pub const MIN_RESULT_CHARS: usize = 20;
pub const SEARCH_RESULT_LIMIT: usize = 5;
pub const MAX_LABEL_CHARS: usize = 60;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedItem {
    pub source: String,
    pub title: Option<String>,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub label: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub items: Vec<FetchedItem>,
    pub failures: Vec<FetchFailure>,
}

pub async fn run_tasks(discovery: &dyn DiscoveryProvider, tasks: &[FetchTask]) -> FetchReport {
    let mut report = FetchReport::default();

    for task in tasks {
        let outcome = match task {
            FetchTask::Url(url) => scrape(discovery, url).await,
            FetchTask::Search(query) => search(discovery, query).await,
        };

        match outcome {
            Ok(items) => {
                debug!(
                    event_name = "agent.lead.fetch_task",
                    provider = discovery.name(),
                    task = task.label(),
                    kept = items.len(),
                    "fetch task finished"
                );
                report.items.extend(items);
            }
            Err(error) => {
                let label = bounded(task.label(), MAX_LABEL_CHARS).to_string();
                warn!(
                    event_name = "agent.lead.fetch_task_failed",
                    provider = discovery.name(),
                    task = %label,
                    error_class = error.error_class(),
                    error = %error,
                    "fetch task failed"
                );
                report.failures.push(FetchFailure { label, message: error.to_string() });
            }
        }
    }

    report
}

async fn scrape(
    discovery: &dyn DiscoveryProvider,
    url: &str,
) -> Result<Vec<FetchedItem>, ProviderError> {
    let page = discovery.scrape(url).await?;
    let content = page.content.trim();
    if content.chars().count() <= MIN_PAGE_CHARS {
        return Ok(Vec::new());
    }
    let title = page.metadata.get("title").and_then(|title| title.as_str()).map(str::to_string);
    Ok(vec![FetchedItem {
        source: url.to_string(),
        title,
        content: bounded(content, MAX_ITEM_CHARS).to_string(),
    }])
}

async fn search(
    discovery: &dyn DiscoveryProvider,
    query: &str,
) -> Result<Vec<FetchedItem>, ProviderError> {
    let hits = discovery.search(query, &SearchOptions { limit: SEARCH_RESULT_LIMIT }).await?;
    Ok(hits
        .iter()
        .take(SEARCH_RESULT_LIMIT)
        .filter_map(|hit| {
            let text = hit.best_text()?;
            (text.chars().count() > MIN_RESULT_CHARS).then(|| FetchedItem {
                source: hit.url.clone(),
                title: hit.title.clone(),
                content: bounded(text, MAX_ITEM_CHARS).to_string(),
            })
        })
        .collect())
}
