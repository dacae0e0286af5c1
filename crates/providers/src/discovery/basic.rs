use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::{DiscoveryProvider, ScrapedPage, SearchHit, SearchOptions};
use crate::error::ProviderError;
use crate::http::{send_text, truncate_chars};

const PROVIDER: &str = "basic";

/// Plain GET plus tag stripping. Has no search capability.
pub struct BasicDiscovery {
    client: Client,
    max_content_chars: usize,
}

impl BasicDiscovery {
    pub fn new(client: Client, max_content_chars: usize) -> Self {
        Self { client, max_content_chars }
    }
}

#[async_trait]
impl DiscoveryProvider for BasicDiscovery {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ProviderError> {
        debug!(event_name = "provider.discovery.scrape", provider = PROVIDER, url, "fetching page");
        let html = send_text(PROVIDER, self.client.get(url)).await?;
        let title = extract_title(&html);
        let text = extract_text_from_html(&html);

        Ok(ScrapedPage {
            content: truncate_chars(&text, self.max_content_chars),
            metadata: json!({"url": url, "title": title, "provider": PROVIDER}),
        })
    }

    async fn search(
        &self,
        _query: &str,
        _options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, ProviderError> {
        Err(ProviderError::Unsupported { provider: PROVIDER, capability: "search" })
    }
}

/// Drops script/style blocks and tags, decodes common entities, collapses whitespace.
pub fn extract_text_from_html(html: &str) -> String {
    let without_scripts = remove_blocks(html, "script");
    let without_styles = remove_blocks(&without_scripts, "style");

    let mut text = String::with_capacity(without_styles.len());
    let mut in_tag = false;
    for ch in without_styles.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    html_decode(&collapsed)
}

fn remove_blocks(html: &str, tag: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let mut output = String::with_capacity(html.len());
    let mut cursor = 0;
    while let Some(start) = lower[cursor..].find(&open).map(|offset| cursor + offset) {
        output.push_str(&html[cursor..start]);
        match lower[start..].find(&close) {
            Some(end) => cursor = start + end + close.len(),
            None => {
                cursor = html.len();
                break;
            }
        }
    }
    output.push_str(&html[cursor..]);
    output
}

fn extract_title(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let start = lower.find("<title")?;
    let open_end = start + lower[start..].find('>')? + 1;
    let close = open_end + lower[open_end..].find("</title>")?;
    let title = html_decode(html[open_end..close].trim());
    (!title.is_empty()).then_some(title)
}

fn html_decode(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
